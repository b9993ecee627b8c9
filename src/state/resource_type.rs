/// Resource classification
///
/// Resource types name the requesting context of a network response (for
/// passively captured resources) or the element a URL was found on (for
/// structurally scanned resources).
use std::fmt;

/// Kind of a recorded resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceType {
    /// A page document (navigation or frame)
    Document,

    /// A hyperlink found on a page (`a[href]`)
    Link,

    Image,

    /// Audio, video, media sources and embeds
    Media,

    Script,

    Stylesheet,

    /// `object[data]` content
    Object,

    Font,

    /// Requests issued by in-page code (xhr/fetch)
    Fetch,

    /// Anything the engine could not classify
    Other,
}

impl ResourceType {
    /// Converts the type to its database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Document => "document",
            Self::Link => "link",
            Self::Image => "image",
            Self::Media => "media",
            Self::Script => "script",
            Self::Stylesheet => "stylesheet",
            Self::Object => "object",
            Self::Font => "font",
            Self::Fetch => "fetch",
            Self::Other => "other",
        }
    }

    /// Parses a type from its database string representation
    ///
    /// Unknown strings map to `Other` so rows written by older builds still load.
    pub fn from_db_string(s: &str) -> Self {
        match s {
            "document" => Self::Document,
            "link" => Self::Link,
            "image" => Self::Image,
            "media" => Self::Media,
            "script" => Self::Script,
            "stylesheet" => Self::Stylesheet,
            "object" => Self::Object,
            "font" => Self::Font,
            "fetch" | "xhr" => Self::Fetch,
            _ => Self::Other,
        }
    }

    /// Returns all resource types
    pub fn all_types() -> Vec<Self> {
        vec![
            Self::Document,
            Self::Link,
            Self::Image,
            Self::Media,
            Self::Script,
            Self::Stylesheet,
            Self::Object,
            Self::Font,
            Self::Fetch,
            Self::Other,
        ]
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

/// How a resource record came to be written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiscoveryPath {
    /// The rendering engine issued a request for it while the page was open
    Passive,

    /// Found by scanning the settled page markup and probed
    Structural,

    /// The page itself could not be navigated
    Navigation,
}

impl DiscoveryPath {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Passive => "passive",
            Self::Structural => "structural",
            Self::Navigation => "navigation",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "passive" => Some(Self::Passive),
            "structural" => Some(Self::Structural),
            "navigation" => Some(Self::Navigation),
            _ => None,
        }
    }
}

impl fmt::Display for DiscoveryPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}
