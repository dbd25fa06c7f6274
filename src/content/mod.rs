//! Content references: which project or post a request is about.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Project,
    Post,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Project => "project",
            Category::Post => "post",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "project" | "projects" => Ok(Category::Project),
            "post" | "posts" | "blog" => Ok(Category::Post),
            other => Err(format!("unknown content category: {other} (expected project or post)")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentReference {
    category: Category,
    identifier: String,
}

impl ContentReference {
    pub fn new(category: Category, identifier: impl Into<String>) -> Self {
        Self { category, identifier: identifier.into() }
    }

    pub fn project(identifier: impl Into<String>) -> Self {
        Self::new(Category::Project, identifier)
    }

    pub fn post(identifier: impl Into<String>) -> Self {
        Self::new(Category::Post, identifier)
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// True when the identifier could escape its category root.
    pub fn looks_like_traversal(&self) -> bool {
        let id = self.identifier.as_str();
        id.is_empty()
            || id == "."
            || id.contains("..")
            || id.contains('/')
            || id.contains('\\')
            || std::path::Path::new(id).is_absolute()
    }
}

impl fmt::Display for ContentReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.category, self.identifier)
    }
}
