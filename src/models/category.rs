//! Category model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A product category; names are unique across the collection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    /// Unique numeric identifier
    pub id: u64,

    /// Category name (unique)
    pub name: String,

    /// When the category was created
    pub created_at: DateTime<Utc>,
}

impl Category {
    /// Create a new category
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_category() {
        let category = Category::new(1, "Beverages");
        assert_eq!(category.id, 1);
        assert_eq!(category.name, "Beverages");
    }
}
