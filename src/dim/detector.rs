/// How free text handed to a field should be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextShape {
    /// Empty or whitespace only.
    Blank,
    /// The database's textual composite form, "(comparator,magnitude,units)".
    Composite,
    /// A bare number; the field's default unit applies.
    Number,
    /// Anything else goes to the registry's expression parser.
    Expression,
}

pub fn classify_text(s: &str) -> TextShape {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        TextShape::Blank
    } else if trimmed.starts_with('(') && trimmed.ends_with(')') {
        TextShape::Composite
    } else if crate::numeric::is_decimal_literal(trimmed) {
        TextShape::Number
    } else {
        TextShape::Expression
    }
}
