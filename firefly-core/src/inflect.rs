//! Type name to collection name resolution.
//!
//! A model's collection is its type name in snake case, pluralized with the usual
//! English rules: `Bug` lives in `bugs`, `UserProfile` in `user_profiles`,
//! `Category` in `categories`. `#[derive(Model)]` runs the same rules at compile time.
//!
//! Irregular plurals come from the `Inflector` tables; a noun missing from those
//! tables gets the regular suffix rules.

use inflector::Inflector;

/// Resolves the collection name for a model type name.
pub fn collection_name(type_name: &str) -> String {
    type_name.to_snake_case().to_plural()
}

#[cfg(test)]
mod tests {
    use super::collection_name;

    #[test]
    fn pluralizes_simple_names() {
        assert_eq!(collection_name("Bug"), "bugs");
        assert_eq!(collection_name("Firefly"), "fireflies");
        assert_eq!(collection_name("Box"), "boxes");
    }

    #[test]
    fn snake_cases_compound_names() {
        assert_eq!(collection_name("UserProfile"), "user_profiles");
        assert_eq!(collection_name("userProfile"), "user_profiles");
        assert_eq!(collection_name("BugReportCategory"), "bug_report_categories");
    }

    #[test]
    fn resolution_is_stable() {
        assert_eq!(collection_name("Bug"), collection_name("Bug"));
    }
}
