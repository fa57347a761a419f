/// File categorization for sorting files by type.
///
/// This module maps file extensions (and, for extension-less files, MIME types
/// detected from content) to the categories whose folders files are sorted
/// into. Lookups never fail: anything unrecognized lands in [`Category::Other`].
///
/// # Examples
///
/// ```
/// use autosort::file_category::{Category, FileMapper};
///
/// let mapper = FileMapper::default();
/// assert_eq!(mapper.classify("jpg"), Category::Image);
/// assert_eq!(mapper.classify(".MP3"), Category::Audio);
/// assert_eq!(mapper.classify("xyz"), Category::Other);
/// ```
use crate::walker::FileEntry;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// A destination bucket for files.
///
/// The label of a category is also the name of the folder its files are
/// sorted into.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    /// Image files (PNG, JPG, GIF, etc.)
    Image,
    /// Audio files (MP3, WAV, FLAC, etc.)
    Audio,
    /// Video files (MP4, MKV, AVI, etc.)
    Video,
    /// Document files (PDF, DOCX, TXT, etc.)
    Document,
    /// Archive files (ZIP, RAR, 7Z, etc.)
    Archive,
    /// Code/Source files (Rust, Python, JavaScript, etc.)
    Code,
    /// Spreadsheet files (XLSX, CSV, ODS, etc.)
    Spreadsheet,
    /// Presentation files (PPTX, ODP, etc.)
    Presentation,
    /// Font files (TTF, OTF, WOFF, etc.)
    Font,
    /// Unknown or uncategorized files
    Other,
    /// A category introduced by configuration.
    Custom(String),
}

impl Category {
    /// Every built-in category, `Other` included.
    pub const BUILTIN: [Category; 10] = [
        Category::Image,
        Category::Audio,
        Category::Video,
        Category::Document,
        Category::Archive,
        Category::Code,
        Category::Spreadsheet,
        Category::Presentation,
        Category::Font,
        Category::Other,
    ];

    /// Returns the folder name for this category.
    ///
    /// # Examples
    ///
    /// ```
    /// use autosort::file_category::Category;
    ///
    /// assert_eq!(Category::Image.dir_name(), "Images");
    /// assert_eq!(Category::Audio.dir_name(), "Music");
    /// assert_eq!(Category::Custom("Logs".into()).dir_name(), "Logs");
    /// ```
    pub fn dir_name(&self) -> &str {
        match self {
            Category::Image => "Images",
            Category::Audio => "Music",
            Category::Video => "Videos",
            Category::Document => "Documents",
            Category::Archive => "Archives",
            Category::Code => "Code",
            Category::Spreadsheet => "Spreadsheets",
            Category::Presentation => "Presentations",
            Category::Font => "Fonts",
            Category::Other => "Other",
            Category::Custom(label) => label,
        }
    }

    /// Resolves a configured label to a category.
    ///
    /// Labels naming a built-in folder (case-insensitively) map to that
    /// built-in category, anything else becomes [`Category::Custom`].
    pub fn from_label(label: &str) -> Category {
        Self::BUILTIN
            .iter()
            .find(|category| category.dir_name().eq_ignore_ascii_case(label))
            .cloned()
            .unwrap_or_else(|| Category::Custom(label.to_string()))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Lower-cases an extension and strips its leading dot.
pub fn normalize_extension(ext: &str) -> String {
    ext.trim_start_matches('.').to_lowercase()
}

/// Anything that can decide which category a discovered file belongs to.
pub trait Classifier {
    /// Returns the category for `entry`. Must be total and deterministic.
    fn categorize(&self, entry: &FileEntry) -> Category;

    /// Every category this classifier can return.
    fn categories(&self) -> Vec<Category>;
}

/// Maps file extensions and MIME types to categories.
///
/// Extension lookups consult the configured overrides first, then the
/// built-in table, then fall back to [`Category::Other`].
#[derive(Debug, Clone)]
pub struct FileMapper {
    mime_map: HashMap<String, Category>,
    extension_map: HashMap<String, Category>,
    overrides: HashMap<String, Category>,
}

impl FileMapper {
    /// Creates a new `FileMapper` with all standard mappings.
    pub fn new() -> Self {
        let mut mapper = Self {
            mime_map: HashMap::new(),
            extension_map: HashMap::new(),
            overrides: HashMap::new(),
        };
        mapper.populate_standard_mappings();
        mapper
    }

    /// Creates a mapper whose extension lookups prefer `overrides`.
    ///
    /// Keys are normalized, so `".LOG"` and `"log"` are the same override.
    pub fn with_overrides<I, K>(overrides: I) -> Self
    where
        I: IntoIterator<Item = (K, Category)>,
        K: AsRef<str>,
    {
        let mut mapper = Self::new();
        for (ext, category) in overrides {
            mapper
                .overrides
                .insert(normalize_extension(ext.as_ref()), category);
        }
        mapper
    }

    /// Populates the mapper with standard MIME type and extension mappings.
    fn populate_standard_mappings(&mut self) {
        // Image MIME types
        self.add_mime_mapping("image/png", Category::Image);
        self.add_mime_mapping("image/jpeg", Category::Image);
        self.add_mime_mapping("image/gif", Category::Image);
        self.add_mime_mapping("image/webp", Category::Image);
        self.add_mime_mapping("image/bmp", Category::Image);
        self.add_mime_mapping("image/tiff", Category::Image);
        self.add_mime_mapping("image/heif", Category::Image);

        // Audio MIME types
        self.add_mime_mapping("audio/mpeg", Category::Audio);
        self.add_mime_mapping("audio/x-wav", Category::Audio);
        self.add_mime_mapping("audio/ogg", Category::Audio);
        self.add_mime_mapping("audio/x-flac", Category::Audio);
        self.add_mime_mapping("audio/aac", Category::Audio);
        self.add_mime_mapping("audio/m4a", Category::Audio);

        // Video MIME types
        self.add_mime_mapping("video/mp4", Category::Video);
        self.add_mime_mapping("video/quicktime", Category::Video);
        self.add_mime_mapping("video/x-msvideo", Category::Video);
        self.add_mime_mapping("video/x-matroska", Category::Video);
        self.add_mime_mapping("video/webm", Category::Video);
        self.add_mime_mapping("video/x-flv", Category::Video);

        // Document MIME types
        self.add_mime_mapping("application/pdf", Category::Document);
        self.add_mime_mapping("application/msword", Category::Document);
        self.add_mime_mapping(
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            Category::Document,
        );
        self.add_mime_mapping("application/rtf", Category::Document);
        self.add_mime_mapping(
            "application/vnd.oasis.opendocument.text",
            Category::Document,
        );

        // Archive MIME types
        self.add_mime_mapping("application/zip", Category::Archive);
        self.add_mime_mapping("application/vnd.rar", Category::Archive);
        self.add_mime_mapping("application/x-7z-compressed", Category::Archive);
        self.add_mime_mapping("application/x-tar", Category::Archive);
        self.add_mime_mapping("application/gzip", Category::Archive);
        self.add_mime_mapping("application/x-bzip2", Category::Archive);
        self.add_mime_mapping("application/x-xz", Category::Archive);

        // Spreadsheet MIME types
        self.add_mime_mapping("application/vnd.ms-excel", Category::Spreadsheet);
        self.add_mime_mapping(
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            Category::Spreadsheet,
        );
        self.add_mime_mapping(
            "application/vnd.oasis.opendocument.spreadsheet",
            Category::Spreadsheet,
        );

        // Presentation MIME types
        self.add_mime_mapping("application/vnd.ms-powerpoint", Category::Presentation);
        self.add_mime_mapping(
            "application/vnd.openxmlformats-officedocument.presentationml.presentation",
            Category::Presentation,
        );
        self.add_mime_mapping(
            "application/vnd.oasis.opendocument.presentation",
            Category::Presentation,
        );

        // Font MIME types
        self.add_mime_mapping("application/font-woff", Category::Font);
        self.add_mime_mapping("application/font-sfnt", Category::Font);
        self.add_mime_mapping("font/ttf", Category::Font);
        self.add_mime_mapping("font/otf", Category::Font);
        self.add_mime_mapping("font/woff", Category::Font);
        self.add_mime_mapping("font/woff2", Category::Font);

        // File extension mappings (case-insensitive)
        for ext in ["png", "jpg", "jpeg", "gif", "webp", "svg", "bmp", "tiff", "ico", "heic"] {
            self.add_extension_mapping(ext, Category::Image);
        }
        for ext in ["mp3", "wav", "ogg", "flac", "aac", "m4a", "wma"] {
            self.add_extension_mapping(ext, Category::Audio);
        }
        for ext in ["mp4", "mkv", "avi", "mov", "flv", "wmv", "webm", "3gp"] {
            self.add_extension_mapping(ext, Category::Video);
        }
        for ext in ["pdf", "txt", "doc", "docx", "html", "htm", "md", "rtf", "odt"] {
            self.add_extension_mapping(ext, Category::Document);
        }
        for ext in ["zip", "rar", "7z", "tar", "gz", "tgz", "bz2", "xz"] {
            self.add_extension_mapping(ext, Category::Archive);
        }
        for ext in [
            "py", "java", "c", "cpp", "h", "hpp", "cs", "js", "ts", "rs", "go", "sh", "bash",
            "json", "xml", "yaml", "yml", "toml", "css",
        ] {
            self.add_extension_mapping(ext, Category::Code);
        }
        for ext in ["csv", "xls", "xlsx", "ods"] {
            self.add_extension_mapping(ext, Category::Spreadsheet);
        }
        for ext in ["ppt", "pptx", "odp"] {
            self.add_extension_mapping(ext, Category::Presentation);
        }
        for ext in ["ttf", "otf", "woff", "woff2"] {
            self.add_extension_mapping(ext, Category::Font);
        }
    }

    /// Adds a MIME type to category mapping.
    pub fn add_mime_mapping(&mut self, mime: &str, category: Category) {
        self.mime_map.insert(mime.to_lowercase(), category);
    }

    /// Adds a file extension to category mapping.
    pub fn add_extension_mapping(&mut self, ext: &str, category: Category) {
        self.extension_map.insert(normalize_extension(ext), category);
    }

    /// Maps a MIME type to a category.
    ///
    /// # Examples
    ///
    /// ```
    /// use autosort::file_category::{Category, FileMapper};
    ///
    /// let mapper = FileMapper::default();
    /// assert_eq!(mapper.mime_to_category("image/png"), Some(Category::Image));
    /// assert_eq!(mapper.mime_to_category("unknown/type"), None);
    /// ```
    pub fn mime_to_category(&self, mime_type: &str) -> Option<Category> {
        self.mime_map.get(&mime_type.to_lowercase()).cloned()
    }

    /// Maps a file extension to a category, consulting overrides first.
    ///
    /// Returns `None` when neither the overrides nor the built-in table know
    /// the extension.
    pub fn extension_to_category(&self, ext: &str) -> Option<Category> {
        let ext = normalize_extension(ext);
        self.overrides
            .get(&ext)
            .or_else(|| self.extension_map.get(&ext))
            .cloned()
    }

    /// Classifies a file extension. Never fails: unknown extensions are
    /// [`Category::Other`].
    pub fn classify(&self, ext: &str) -> Category {
        self.extension_to_category(ext).unwrap_or(Category::Other)
    }

    /// Determines the category from an optional MIME type and extension.
    ///
    /// The extension wins when it is known, the MIME type is consulted only
    /// when the extension is missing or unknown.
    pub fn categorize_parts(&self, mime_type: Option<&str>, ext: Option<&str>) -> Category {
        if let Some(extension) = ext
            && let Some(category) = self.extension_to_category(extension)
        {
            return category;
        }

        if let Some(mime) = mime_type
            && let Some(category) = self.mime_to_category(mime)
        {
            return category;
        }

        Category::Other
    }
}

impl Default for FileMapper {
    fn default() -> Self {
        Self::new()
    }
}

impl Classifier for FileMapper {
    /// Files with an extension are classified by it alone. Files without one
    /// are sniffed for a content signature.
    fn categorize(&self, entry: &FileEntry) -> Category {
        if !entry.extension.is_empty() {
            return self.classify(&entry.extension);
        }

        let mime = infer::get_from_path(&entry.path)
            .ok()
            .flatten()
            .map(|kind| kind.mime_type());
        self.categorize_parts(mime, None)
    }

    fn categories(&self) -> Vec<Category> {
        let mut categories: Vec<Category> = Category::BUILTIN.to_vec();
        for category in self.overrides.values() {
            if !categories.contains(category) {
                categories.push(category.clone());
            }
        }
        categories
    }
}

/// Classifies `extension` against the built-in table and `overrides`.
///
/// Lookup order is overrides, built-in table, then [`Category::Other`].
/// This is the extension-only path of [`FileMapper::categorize`].
pub fn classify(extension: &str, overrides: &BTreeMap<String, Category>) -> Category {
    FileMapper::with_overrides(overrides.iter().map(|(ext, category)| (ext, category.clone())))
        .classify(extension)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_category_dir_names() {
        assert_eq!(Category::Image.dir_name(), "Images");
        assert_eq!(Category::Audio.dir_name(), "Music");
        assert_eq!(Category::Video.dir_name(), "Videos");
        assert_eq!(Category::Document.dir_name(), "Documents");
        assert_eq!(Category::Archive.dir_name(), "Archives");
        assert_eq!(Category::Code.dir_name(), "Code");
        assert_eq!(Category::Spreadsheet.dir_name(), "Spreadsheets");
        assert_eq!(Category::Presentation.dir_name(), "Presentations");
        assert_eq!(Category::Font.dir_name(), "Fonts");
        assert_eq!(Category::Other.dir_name(), "Other");
    }

    #[test]
    fn test_from_label_resolves_builtins_case_insensitively() {
        assert_eq!(Category::from_label("images"), Category::Image);
        assert_eq!(Category::from_label("MUSIC"), Category::Audio);
        assert_eq!(
            Category::from_label("Logs"),
            Category::Custom("Logs".to_string())
        );
    }

    #[test]
    fn test_mime_to_category() {
        let mapper = FileMapper::default();
        assert_eq!(mapper.mime_to_category("image/png"), Some(Category::Image));
        assert_eq!(mapper.mime_to_category("IMAGE/PNG"), Some(Category::Image));
        assert_eq!(mapper.mime_to_category("audio/mpeg"), Some(Category::Audio));
        assert_eq!(mapper.mime_to_category("unknown/type"), None);
    }

    #[test]
    fn test_classify_normalizes_extension() {
        let mapper = FileMapper::default();
        assert_eq!(mapper.classify("pdf"), Category::Document);
        assert_eq!(mapper.classify(".PDF"), Category::Document);
        assert_eq!(mapper.classify("Mp3"), Category::Audio);
        assert_eq!(mapper.classify("rs"), Category::Code);
    }

    #[test]
    fn test_classify_defaults_to_other() {
        let mapper = FileMapper::default();
        assert_eq!(mapper.classify("xyz"), Category::Other);
        assert_eq!(mapper.classify(""), Category::Other);
    }

    #[test]
    fn test_overrides_take_precedence() {
        let mapper = FileMapper::with_overrides([
            (".LOG", Category::Custom("Logs".to_string())),
            ("txt", Category::Code),
        ]);
        assert_eq!(mapper.classify("log"), Category::Custom("Logs".to_string()));
        assert_eq!(mapper.classify("txt"), Category::Code);
        assert_eq!(mapper.classify("pdf"), Category::Document);
    }

    #[test]
    fn test_free_classify_with_overrides() {
        let mut overrides = BTreeMap::new();
        overrides.insert(".Md".to_string(), Category::Code);
        assert_eq!(classify(".MD", &overrides), Category::Code);
        assert_eq!(classify("jpg", &overrides), Category::Image);
        assert_eq!(classify("nope", &overrides), Category::Other);
    }

    #[test]
    fn test_categorize_parts_prefers_known_extension() {
        let mapper = FileMapper::default();
        assert_eq!(
            mapper.categorize_parts(Some("image/png"), Some("txt")),
            Category::Document
        );
        assert_eq!(
            mapper.categorize_parts(Some("image/png"), Some("xyz")),
            Category::Image
        );
        assert_eq!(mapper.categorize_parts(None, None), Category::Other);
    }

    #[test]
    fn test_categorize_sniffs_extensionless_files() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("scan");
        let mut png = vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
        png.extend_from_slice(&[0u8; 32]);
        fs::write(&path, &png).expect("Failed to write test file");

        let entry = FileEntry {
            path: path.clone(),
            size_bytes: png.len() as u64,
            extension: String::new(),
            archive_format: None,
        };
        assert_eq!(FileMapper::default().categorize(&entry), Category::Image);
    }

    #[test]
    fn test_categorize_unreadable_extensionless_file_is_other() {
        let entry = FileEntry {
            path: PathBuf::from("/definitely/not/here"),
            size_bytes: 0,
            extension: String::new(),
            archive_format: None,
        };
        assert_eq!(FileMapper::default().categorize(&entry), Category::Other);
    }

    #[test]
    fn test_categories_include_custom_overrides() {
        let mapper = FileMapper::with_overrides([("log", Category::Custom("Logs".to_string()))]);
        let categories = mapper.categories();
        assert!(categories.contains(&Category::Other));
        assert!(categories.contains(&Category::Custom("Logs".to_string())));
        assert_eq!(categories.len(), Category::BUILTIN.len() + 1);
    }
}
