use proptest::prelude::*;
use stow_storage::{MAX_STORED_NAME_BYTES, sanitize};

fn upload_like_name() -> impl Strategy<Value = String> {
    prop_oneof![
        any::<String>(),
        "[ ./\\\\a-zA-Z0-9_'~-]{0,40}(\\.[a-zA-Z0-9]{0,6})?",
        "[а-яё ]{1,20}\\.(png|txt|pdf)",
        "(\\.\\./)*[a-z]{1,200}\\.[a-z]{1,5}",
    ]
}

proptest! {
    #[test]
    fn outputs_stay_in_their_character_classes(raw in upload_like_name()) {
        let sanitized = sanitize(raw.as_str());

        prop_assert!(sanitized.name().bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-'));
        prop_assert!(sanitized.extension().bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit()));
        prop_assert!(!sanitized.name().starts_with('-'));
        prop_assert!(!sanitized.name().ends_with('-'));
    }

    #[test]
    fn non_empty_names_fit_the_stored_name_limit(raw in upload_like_name()) {
        let sanitized = sanitize(raw.as_str());
        prop_assume!(!sanitized.name().is_empty());

        prop_assert!(sanitized.to_string().len() <= MAX_STORED_NAME_BYTES);
    }

    #[test]
    fn sanitizing_the_canonical_form_is_a_no_op(raw in upload_like_name()) {
        let sanitized = sanitize(raw.as_str());
        prop_assume!(!sanitized.name().is_empty());

        let canonical = sanitized.to_string();
        prop_assert_eq!(sanitize(canonical.as_str()), sanitized);
    }
}
