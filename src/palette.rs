//! Style option palette for the inspector panel
//!
//! Each category is a "pick one of N" control: its option classes are
//! mutually exclusive, so choosing one removes every other class of the same
//! category from the selected elements.

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur when loading or parsing palettes
#[derive(Error, Debug)]
pub enum PaletteError {
    #[error("Failed to read palette file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse palette TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Duplicate palette category '{0}'")]
    DuplicateCategory(String),
}

/// One choice within a category
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StyleOption {
    pub name: String,
    /// Class applied for this option; empty means "remove the category"
    #[serde(default)]
    pub class: String,
    /// Preview colour for the panel
    pub swatch: Option<String>,
}

/// A group of mutually exclusive options for one style property
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StyleCategory {
    pub property: String,
    pub label: String,
    pub options: Vec<StyleOption>,
}

impl StyleCategory {
    /// Find an option by name (case-insensitive) or by class
    pub fn option(&self, name: &str) -> Option<&StyleOption> {
        self.options
            .iter()
            .find(|o| o.name.eq_ignore_ascii_case(name) || (!o.class.is_empty() && o.class == name))
    }

    /// Every non-empty class of the category
    pub fn exclusive_classes(&self) -> Vec<&str> {
        self.options
            .iter()
            .map(|o| o.class.as_str())
            .filter(|c| !c.is_empty())
            .collect()
    }
}

/// The set of style categories offered by the panel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StylePalette {
    /// Optional name for the palette
    pub name: Option<String>,
    pub categories: Vec<StyleCategory>,
}

/// TOML structure for deserializing palettes
#[derive(Deserialize)]
struct TomlPalette {
    metadata: Option<TomlMetadata>,
    #[serde(default, rename = "category")]
    categories: Vec<StyleCategory>,
}

#[derive(Deserialize)]
struct TomlMetadata {
    name: Option<String>,
}

/// Default palette - tailwind utility classes
const DEFAULT_PALETTE: &str = r##"
[metadata]
name = "tailwind"

[[category]]
property = "text-color"
label = "Text color"
options = [
  { name = "Black", class = "text-black", swatch = "#000000" },
  { name = "Dark Gray", class = "text-gray-700", swatch = "#374151" },
  { name = "Gray", class = "text-gray-500", swatch = "#6B7280" },
  { name = "Red", class = "text-red-500", swatch = "#EF4444" },
  { name = "Blue", class = "text-blue-500", swatch = "#3B82F6" },
  { name = "Green", class = "text-green-500", swatch = "#10B981" },
  { name = "Yellow", class = "text-yellow-500", swatch = "#F59E0B" },
  { name = "Purple", class = "text-purple-500", swatch = "#8B5CF6" },
  { name = "Pink", class = "text-pink-500", swatch = "#EC4899" },
  { name = "Indigo", class = "text-indigo-500", swatch = "#6366F1" },
]

[[category]]
property = "background-color"
label = "Background"
options = [
  { name = "None", class = "bg-transparent", swatch = "transparent" },
  { name = "White", class = "bg-white", swatch = "#FFFFFF" },
  { name = "Light Gray", class = "bg-gray-100", swatch = "#F3F4F6" },
  { name = "Gray", class = "bg-gray-200", swatch = "#E5E7EB" },
  { name = "Light Red", class = "bg-red-100", swatch = "#FEE2E2" },
  { name = "Light Blue", class = "bg-blue-100", swatch = "#DBEAFE" },
  { name = "Light Green", class = "bg-green-100", swatch = "#D1FAE5" },
  { name = "Light Yellow", class = "bg-yellow-100", swatch = "#FEF3C7" },
  { name = "Light Purple", class = "bg-purple-100", swatch = "#E9D5FF" },
  { name = "Light Pink", class = "bg-pink-100", swatch = "#FCE7F3" },
]

[[category]]
property = "font-size"
label = "Font size"
options = [
  { name = "Tiny", class = "text-xs" },
  { name = "Small", class = "text-sm" },
  { name = "Normal", class = "text-base" },
  { name = "Large", class = "text-lg" },
  { name = "XL", class = "text-xl" },
  { name = "2XL", class = "text-2xl" },
  { name = "3XL", class = "text-3xl" },
]

[[category]]
property = "padding"
label = "Spacing"
options = [
  { name = "None", class = "p-0" },
  { name = "Small", class = "p-2" },
  { name = "Medium", class = "p-4" },
  { name = "Large", class = "p-6" },
  { name = "XL", class = "p-8" },
]

[[category]]
property = "border-radius"
label = "Rounding"
options = [
  { name = "None", class = "rounded-none" },
  { name = "Small", class = "rounded-sm" },
  { name = "Medium", class = "rounded-md" },
  { name = "Large", class = "rounded-lg" },
  { name = "XL", class = "rounded-xl" },
  { name = "Full", class = "rounded-full" },
]

[[category]]
property = "animation"
label = "Animation"
options = [
  { name = "None", class = "" },
  { name = "Bounce", class = "animate-bounce" },
  { name = "Pulse", class = "animate-pulse" },
  { name = "Ping", class = "animate-ping" },
  { name = "Spin", class = "animate-spin" },
]
"##;

impl StylePalette {
    /// Load palette from TOML file
    pub fn from_file(path: &Path) -> Result<Self, PaletteError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load palette from TOML string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, PaletteError> {
        let parsed: TomlPalette = toml::from_str(content)?;

        for (i, category) in parsed.categories.iter().enumerate() {
            if parsed.categories[..i]
                .iter()
                .any(|c| c.property == category.property)
            {
                return Err(PaletteError::DuplicateCategory(category.property.clone()));
            }
        }

        Ok(StylePalette {
            name: parsed.metadata.and_then(|m| m.name),
            categories: parsed.categories,
        })
    }

    /// Look up a category by its property name
    pub fn category(&self, property: &str) -> Option<&StyleCategory> {
        self.categories.iter().find(|c| c.property == property)
    }
}

impl Default for StylePalette {
    fn default() -> Self {
        Self::from_str(DEFAULT_PALETTE).expect("Default palette should be valid TOML")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_palette() {
        let palette = StylePalette::default();
        assert_eq!(palette.name.as_deref(), Some("tailwind"));
        let properties: Vec<_> = palette.categories.iter().map(|c| c.property.as_str()).collect();
        assert_eq!(
            properties,
            vec![
                "text-color",
                "background-color",
                "font-size",
                "padding",
                "border-radius",
                "animation"
            ]
        );
    }

    #[test]
    fn test_option_lookup() {
        let palette = StylePalette::default();
        let bg = palette.category("background-color").unwrap();
        assert_eq!(bg.option("light blue").unwrap().class, "bg-blue-100");
        assert_eq!(bg.option("bg-white").unwrap().name, "White");
        assert!(bg.option("Chartreuse").is_none());
    }

    #[test]
    fn test_exclusive_classes_skip_empty() {
        let palette = StylePalette::default();
        let animation = palette.category("animation").unwrap();
        assert_eq!(
            animation.exclusive_classes(),
            vec!["animate-bounce", "animate-pulse", "animate-ping", "animate-spin"]
        );
        assert_eq!(animation.option("None").unwrap().class, "");
    }

    #[test]
    fn test_parse_custom_palette() {
        let toml_str = r##"
[[category]]
property = "weight"
label = "Weight"
options = [{ name = "Bold", class = "font-bold" }]
"##;
        let palette = StylePalette::from_str(toml_str).expect("Should parse");
        assert_eq!(palette.name, None);
        assert_eq!(palette.category("weight").unwrap().options.len(), 1);
    }

    #[test]
    fn test_duplicate_category_rejected() {
        let toml_str = r##"
[[category]]
property = "weight"
label = "Weight"
options = []

[[category]]
property = "weight"
label = "Again"
options = []
"##;
        assert!(matches!(
            StylePalette::from_str(toml_str),
            Err(PaletteError::DuplicateCategory(_))
        ));
    }

    #[test]
    fn test_invalid_toml_error() {
        let invalid = "this is not valid toml {{{{";
        assert!(StylePalette::from_str(invalid).is_err());
    }
}
