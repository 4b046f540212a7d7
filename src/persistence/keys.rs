use crate::layer::FolderId;

/// Lowercase, drop everything but alphanumerics, spaces, hyphens and
/// underscores, then collapse whitespace runs into single hyphens.
pub fn slugify(text: &str) -> String {
    let kept: String = text
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || *c == '-' || *c == '_')
        .collect();
    kept.split_whitespace().collect::<Vec<_>>().join("-")
}

/// Keep a file name safe for a storage path: anything outside
/// `[A-Za-z0-9._-]` becomes `_`
pub fn sanitize_file_name(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if sanitized.is_empty() {
        "file".to_owned()
    } else {
        sanitized
    }
}

/// Where the scene lives in the production hierarchy
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AssetScope {
    pub project_title: String,
    pub project_id: String,
    pub chapter_title: String,
    pub chapter_id: String,
    pub sequence_code: String,
    pub sequence_id: String,
    pub shot_code: String,
    pub shot_id: String,
}

impl AssetScope {
    /// Common prefix of every asset of this shot
    pub fn prefix(&self) -> String {
        format!(
            "{}-{}/{}-{}/{}-{}/shot-{}-{}",
            slugify(&self.project_title),
            self.project_id,
            slugify(&self.chapter_title),
            self.chapter_id,
            slugify(&self.sequence_code),
            self.sequence_id,
            slugify(&self.shot_code),
            self.shot_id,
        )
    }

    /// Storage key of a frame asset:
    /// `<prefix>/assets/frames/<rowId>/<frameIndex>/<timestamp>-<file>`
    pub fn frame_asset_key(&self, folder: FolderId, timestamp_millis: u64, file_name: &str) -> String {
        format!(
            "{}/assets/frames/{}/{}/{}-{}",
            self.prefix(),
            folder.row,
            folder.frame_index,
            timestamp_millis,
            sanitize_file_name(file_name),
        )
    }
}
