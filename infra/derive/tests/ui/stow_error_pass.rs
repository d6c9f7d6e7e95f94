use std::borrow::Cow;
use stow_derive::stow_error;

#[stow_error]
pub enum DemoError {
    #[error("IO error{}: {source}", format_context(.context))]
    Io {
        #[source]
        source: std::io::Error,
        context: Option<Cow<'static, str>>,
    },

    #[error("Internal error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

fn main() {
    let _: DemoError = "boom".into();
    let _: Result<(), DemoError> = Err(std::io::Error::other("x")).context("reading");
}
