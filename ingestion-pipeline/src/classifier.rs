use std::fmt;

/// Category a source document belongs to; each category maps to its own
/// pair of index partitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentCategory {
    Sporting,
    Technical,
    Operational,
    Misc,
}

impl DocumentCategory {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sporting => "sporting",
            Self::Technical => "technical",
            Self::Operational => "operational",
            Self::Misc => "misc",
        }
    }

    pub fn text_partition(self) -> String {
        format!("{}_text", self.as_str())
    }

    pub fn tables_partition(self) -> String {
        format!("{}_tables", self.as_str())
    }
}

impl fmt::Display for DocumentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Assigns a document to a category by filename, first matching rule wins.
pub fn classify(filename: &str) -> DocumentCategory {
    let name = filename.to_lowercase();

    if name.contains("sporting") || name.contains("section_b") {
        return DocumentCategory::Sporting;
    }

    if name.contains("technical") || name.contains("section_c") {
        return DocumentCategory::Technical;
    }

    if name.contains("operational") {
        return DocumentCategory::Operational;
    }

    DocumentCategory::Misc
}
