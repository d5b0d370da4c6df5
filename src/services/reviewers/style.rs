//! Style and quality reviewer profile.

use super::SpecializedReviewer;

/// Reviews readability, maintainability and convention adherence.
#[derive(Debug, Clone, Copy)]
pub struct StyleReviewer;

const FOCUS_AREAS: &[&str] = &[
    "naming_conventions",
    "code_organization",
    "documentation",
    "type_annotations",
    "error_handling_patterns",
    "test_coverage",
];

const SYSTEM_PROMPT: &str = "\
You are a code style and quality reviewer specializing in readability,
maintainability, and adherence to coding standards and conventions.

Your primary focus areas are:
1. Naming Conventions - Check that names are descriptive, consistent, and follow language conventions
2. Code Organization - Review module structure, type design, and function decomposition
3. Documentation - Verify doc comments and inline documentation quality
4. Type Annotations - Check for precise types on public signatures
5. Error Handling Patterns - Review error propagation and recovery paths
6. Test Coverage - Assess test quality and coverage for the code under review

When reviewing code:
- Follow the language's idiomatic style guidelines
- Check for consistency with existing codebase patterns
- Prioritize maintainability and readability over cleverness
- Consider the impact on future developers maintaining this code
- Flag any code smells or anti-patterns

Be constructive and educational. Each finding should include:
- Clear description of the style or quality issue
- Reference to relevant coding standards where applicable
- Specific suggestions for improvement with examples";

const CHECKLIST: &[&str] = &[
    "Check that variable and function names are descriptive and follow conventions",
    "Verify doc comments are present for all public functions and types",
    "Check for precise types on all public signatures",
    "Look for proper error handling with specific error types",
    "Verify code organization follows single responsibility principle",
    "Check for code duplication that could be refactored",
    "Look for overly complex functions that should be split",
    "Verify consistent formatting and indentation throughout",
    "Check for magic numbers or strings that should be constants",
    "Look for dead code or unused imports",
    "Verify proper module structure and import organization",
    "Check that comments explain 'why' not just 'what'",
    "Look for proper use of scope guards for resource handling",
    "Verify test functions have descriptive names and clear assertions",
    "Check for structured logging instead of print statements",
];

impl SpecializedReviewer for StyleReviewer {
    fn reviewer_type(&self) -> &'static str {
        "style"
    }

    fn focus_areas(&self) -> &'static [&'static str] {
        FOCUS_AREAS
    }

    fn severity_weight(&self, focus_area: &str) -> f64 {
        match focus_area {
            "error_handling_patterns" => 0.7,
            "type_annotations" => 0.5,
            "naming_conventions" | "code_organization" => 0.4,
            "documentation" | "test_coverage" => 0.3,
            _ => 0.0,
        }
    }

    fn system_prompt(&self) -> &'static str {
        SYSTEM_PROMPT
    }

    fn checklist(&self) -> &'static [&'static str] {
        CHECKLIST
    }
}
