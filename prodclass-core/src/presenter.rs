use prodclass_client::{AttributeMap, ClassificationResult, display_value};
use serde::Serialize;

pub const GLOBAL_HEADING: &str = "Global Attributes";
pub const CATEGORY_SPECIFIC_HEADING: &str = "Category-Specific Attributes";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttributeRow {
    pub name: String,
    pub value: String,
}

/// One titled table of attributes. `rows` may be empty; the heading is still shown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttributeGroup {
    pub heading: String,
    pub rows: Vec<AttributeRow>,
}

impl AttributeGroup {
    fn from_map(heading: &str, attributes: &AttributeMap) -> Self {
        Self {
            heading: heading.to_string(),
            rows: attributes
                .iter()
                .map(|(name, value)| AttributeRow {
                    name: name.clone(),
                    value: display_value(value),
                })
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Width of the longest attribute name, in characters. Used to align the value column.
    pub fn name_width(&self) -> usize {
        self.rows
            .iter()
            .map(|row| row.name.chars().count())
            .max()
            .unwrap_or(0)
    }
}

/// Display-ready form of a [`ClassificationResult`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedResult {
    pub title: String,
    /// Always the global group followed by the category-specific group.
    pub groups: Vec<AttributeGroup>,
}

impl RenderedResult {
    pub fn group(&self, heading: &str) -> Option<&AttributeGroup> {
        self.groups.iter().find(|g| g.heading == heading)
    }
}

/// Turns results into grouped rows, preserving the service's attribute order.
#[derive(Debug, Default, Clone, Copy)]
pub struct AttributePresenter;

impl AttributePresenter {
    pub fn new() -> Self {
        Self
    }

    pub fn render(&self, result: &ClassificationResult) -> RenderedResult {
        let attributes = &result.classified_attributes;
        RenderedResult {
            title: result.product_title.clone(),
            groups: vec![
                AttributeGroup::from_map(GLOBAL_HEADING, &attributes.global),
                AttributeGroup::from_map(CATEGORY_SPECIFIC_HEADING, &attributes.category_specific),
            ],
        }
    }
}
