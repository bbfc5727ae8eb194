//! Natural-language file manager rooted at one directory.

use async_trait::async_trait;
use parking_lot::Mutex;
use personalaios_core::format::{format_size, help_text};
use personalaios_core::fuzzy::{self, FuzzyOptions, MatchTier, TieBreak};
use personalaios_core::{
    ContextRules, FillerStyle, Intent, IntentEngine, IntentHandler, IntentMatch, MatchPolicy,
    Normalizer, PatternTable, ShellError, ShellResult,
};
use personalaios_executor::Desktop;
use std::io;
use std::path::{Component as PathPart, Path, PathBuf};
use tokio::fs;

const FIND_LIMIT: usize = 10;
const LIST_LIMIT: usize = 20;
const SEARCH_ENTRY_CAP: usize = 20_000;
const RESOLVE: FuzzyOptions = FuzzyOptions::new(0.4, TieBreak::FirstQualifying);
const INVALID_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

const FILLERS: &[&str] = &["i'd like to", "can you", "please", "would you"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileIntent {
    CreateFile,
    CreateDirectory,
    FindFile,
    OpenFile,
    DeleteFile,
    ListFiles,
    CopyFile,
    MoveFile,
}

impl Intent for FileIntent {
    fn as_str(&self) -> &'static str {
        match self {
            FileIntent::CreateFile => "create_file",
            FileIntent::CreateDirectory => "create_directory",
            FileIntent::FindFile => "find_file",
            FileIntent::OpenFile => "open_file",
            FileIntent::DeleteFile => "delete_file",
            FileIntent::ListFiles => "list_files",
            FileIntent::CopyFile => "copy_file",
            FileIntent::MoveFile => "move_file",
        }
    }
}

fn pattern_table() -> Result<PatternTable<FileIntent>, regex::Error> {
    PatternTable::builder()
        .intent(
            FileIntent::CreateFile,
            &[
                r"create (?:a )?file (?:named |called )?(.+)",
                r"make (?:a )?(?:new )?file (?:named |called )?(.+)",
                r"new file (?:named |called )?(.+)",
                r"touch (.+)",
                r"create (.+\.\w+)",
            ],
        )
        .intent(
            FileIntent::CreateDirectory,
            &[
                r"create (?:a )?(?:folder|directory) (?:named |called )?(.+)",
                r"make (?:a )?(?:new )?(?:folder|directory) (?:named |called )?(.+)",
                r"new (?:folder|directory) (?:named |called )?(.+)",
                r"mkdir (.+)",
            ],
        )
        .intent(
            FileIntent::FindFile,
            &[
                r"(?:find|search for|locate|where is) (?:the )?file (?:named |called )?(.+)",
                r"look for (.+)",
                r"find (.+)",
            ],
        )
        .intent(
            FileIntent::OpenFile,
            &[
                r"(?:open|launch|run) (?:the )?file (?:named |called )?(.+)",
                r"open (.+)",
            ],
        )
        .intent(
            FileIntent::DeleteFile,
            &[
                r"(?:delete|remove|trash) (?:the )?file (?:named |called )?(.+)",
                r"delete (.+)",
                r"^rm (.+)",
            ],
        )
        .intent(
            FileIntent::ListFiles,
            &[
                r"list (?:all )?(?:the )?files",
                r"show (?:me )?(?:all )?(?:the )?files",
                r"what files are (?:in )?here",
                r"display (?:the )?contents",
                r"^ls\b",
                r"^dir\b",
            ],
        )
        .intent(
            FileIntent::CopyFile,
            &[
                r"copy (?:the )?file (.+) to (.+)",
                r"duplicate (?:the )?file (.+) (?:to|as) (.+)",
                r"^cp (\S+) (\S+)",
            ],
        )
        .intent(
            FileIntent::MoveFile,
            &[
                r"move (?:the )?file (.+) to (.+)",
                r"rename (?:the )?file (.+) (?:to|as) (.+)",
                r"^mv (\S+) (\S+)",
            ],
        )
        .build()
}

fn context_rules() -> ContextRules {
    ContextRules::new()
        .rule(
            "urgency",
            &[("high", &["urgent", "quickly", "asap", "now", "immediately"])],
        )
        .rule(
            "size",
            &[
                ("large", &["large", "big", "huge"]),
                ("small", &["small", "tiny", "little"]),
            ],
        )
        .rule(
            "type",
            &[
                ("script", &["script"]),
                ("document", &["document", "doc"]),
                ("image", &["image", "picture", "photo"]),
                ("video", &["video", "movie"]),
                ("audio", &["audio", "music", "song"]),
                ("text", &["text"]),
            ],
        )
        .rule(
            "location",
            &[
                ("desktop", &["desktop"]),
                ("documents", &["documents"]),
                ("downloads", &["downloads"]),
                ("home", &["home"]),
            ],
        )
}

/// Strip a leading article and characters not allowed in file names.
pub fn clean_filename(name: &str) -> String {
    let mut name = name.trim();
    for article in ["the ", "a ", "an "] {
        let prefixed = name
            .get(..article.len())
            .is_some_and(|p| p.eq_ignore_ascii_case(article));
        if prefixed && name.len() > article.len() {
            name = &name[article.len()..];
            break;
        }
    }
    name.chars()
        .filter(|c| !INVALID_CHARS.contains(c))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Lexically resolve `.` and `..` in `path` without climbing above `root`.
pub fn clamp_to_root(root: &Path, path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for part in path.components() {
        match part {
            PathPart::CurDir => {}
            PathPart::ParentDir => {
                if out != root && out.starts_with(root) {
                    out.pop();
                }
            }
            other => out.push(other),
        }
    }
    if out.starts_with(root) {
        out
    } else {
        root.to_path_buf()
    }
}

pub fn file_icon(path: &Path, is_dir: bool) -> &'static str {
    if is_dir {
        return "📁";
    }
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "py" => "🐍",
        "js" | "ts" => "📜",
        "html" => "🌐",
        "css" => "🎨",
        "txt" => "📄",
        "md" => "📝",
        "pdf" => "📕",
        "jpg" | "jpeg" | "png" | "gif" | "svg" => "🖼️",
        "mp3" | "wav" | "flac" => "🎵",
        "mp4" | "mkv" | "avi" => "🎬",
        "zip" | "tar" | "gz" => "🗜️",
        "rs" => "🦀",
        _ => "📄",
    }
}

fn template_for(kind: Option<&str>) -> &'static str {
    match kind {
        Some("script") => "#!/bin/bash\n# Script created by PersonalAIOS\n\n",
        Some("document") => "# Document\n\nCreated by PersonalAIOS\n",
        _ => "",
    }
}

#[derive(Debug, Clone)]
struct Entry {
    name: String,
    path: PathBuf,
    is_dir: bool,
    size: u64,
}

/// Entries of `dir`, directories first, then by lowercase name.
async fn read_entries(dir: &Path) -> io::Result<Vec<Entry>> {
    let mut entries = Vec::new();
    let mut reader = fs::read_dir(dir).await?;
    while let Some(entry) = reader.next_entry().await? {
        let metadata = match entry.metadata().await {
            Ok(m) => m,
            Err(e) => {
                tracing::debug!("Skipping {:?}: {}", entry.path(), e);
                continue;
            }
        };
        entries.push(Entry {
            name: entry.file_name().to_string_lossy().to_string(),
            path: entry.path(),
            is_dir: metadata.is_dir(),
            size: metadata.len(),
        });
    }
    entries.sort_by(|a, b| {
        b.is_dir
            .cmp(&a.is_dir)
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
    });
    Ok(entries)
}

async fn count_entries(dir: &Path) -> io::Result<usize> {
    let mut count = 0;
    let mut reader = fs::read_dir(dir).await?;
    while reader.next_entry().await?.is_some() {
        count += 1;
    }
    Ok(count)
}

async fn copy_recursive(from: &Path, to: &Path) -> io::Result<()> {
    let mut pending = vec![(from.to_path_buf(), to.to_path_buf())];
    while let Some((src, dst)) = pending.pop() {
        fs::create_dir_all(&dst).await?;
        let mut reader = fs::read_dir(&src).await?;
        while let Some(entry) = reader.next_entry().await? {
            let target = dst.join(entry.file_name());
            if entry.file_type().await?.is_dir() {
                pending.push((entry.path(), target));
            } else {
                fs::copy(entry.path(), target).await?;
            }
        }
    }
    Ok(())
}

/// Walk `root` breadth-first collecting paths whose name satisfies `matches`.
async fn walk_matching<F>(root: &Path, matches: F) -> Vec<PathBuf>
where
    F: Fn(&str) -> bool,
{
    let mut found = Vec::new();
    let mut queue = std::collections::VecDeque::from([root.to_path_buf()]);
    let mut visited = 0usize;

    while let Some(dir) = queue.pop_front() {
        let mut reader = match fs::read_dir(&dir).await {
            Ok(reader) => reader,
            Err(e) => {
                tracing::debug!("Cannot read {:?}: {}", dir, e);
                continue;
            }
        };
        while let Ok(Some(entry)) = reader.next_entry().await {
            visited += 1;
            if visited > SEARCH_ENTRY_CAP {
                tracing::warn!("File search stopped after {} entries", SEARCH_ENTRY_CAP);
                return found;
            }
            let name = entry.file_name().to_string_lossy().to_lowercase();
            if matches(&name) {
                found.push(entry.path());
            }
            if entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false) {
                queue.push_back(entry.path());
            }
        }
    }
    found.sort();
    found
}

pub struct FileManager {
    engine: IntentEngine<FileIntent>,
    root: PathBuf,
    current: Mutex<PathBuf>,
    desktop: Desktop,
}

impl FileManager {
    pub fn new(root: PathBuf, desktop: Desktop, policy: MatchPolicy) -> ShellResult<Self> {
        let normalizer = Normalizer::new(FILLERS, FillerStyle::Substring)?;
        let engine =
            IntentEngine::new(normalizer, pattern_table()?, context_rules()).with_policy(policy);
        tracing::info!("File manager rooted at {:?}", root);
        Ok(Self {
            engine,
            current: Mutex::new(root.clone()),
            root,
            desktop,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn current_dir(&self) -> PathBuf {
        self.current.lock().clone()
    }

    /// `name` joined onto the current directory, kept under the root.
    fn under_current(&self, name: &str) -> PathBuf {
        clamp_to_root(&self.root, &self.current_dir().join(name))
    }

    fn display_path(&self, path: &Path) -> String {
        path.display().to_string()
    }

    /// Resolve `name` against the current directory: direct path, then
    /// case-insensitive, then substring. Near misses become suggestions.
    async fn resolve_path(&self, name: &str) -> ShellResult<PathBuf> {
        let name = clean_filename(name);
        if name.is_empty() {
            return Err(ShellError::invalid("Please specify a file name"));
        }
        let current = self.current_dir();
        let direct = self.under_current(&name);
        if fs::try_exists(&direct).await.unwrap_or(false) {
            return Ok(direct);
        }

        let entries = read_entries(&current).await?;
        match fuzzy::resolve(&name, entries.iter(), |e| e.name.as_str(), RESOLVE) {
            Some(hit) if hit.tier <= MatchTier::Substring => Ok(hit.item.path.clone()),
            _ => {
                let suggestions =
                    fuzzy::suggest(&name, entries.iter(), |e| e.name.as_str(), 0.4, 3)
                        .into_iter()
                        .map(|e| e.name.clone())
                        .collect();
                Err(ShellError::not_found_with("file", name, suggestions))
            }
        }
    }

    async fn create_file(&self, matched: &IntentMatch<FileIntent>) -> ShellResult<String> {
        let name = matched.entities.target().map(clean_filename).unwrap_or_default();
        if name.is_empty() {
            return Err(ShellError::invalid("Please specify the filename to create"));
        }
        let path = self.under_current(&name);
        if fs::try_exists(&path).await.unwrap_or(false) {
            return Err(ShellError::refused(format!("File already exists: {}", name)));
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, template_for(matched.entities.context("type"))).await?;
        tracing::info!("Created file {:?}", path);
        Ok(format!(
            "📄 **Created file:** {}\n   └─ Path: `{}`",
            name,
            self.display_path(&path)
        ))
    }

    async fn create_directory(&self, matched: &IntentMatch<FileIntent>) -> ShellResult<String> {
        let name = matched.entities.target().map(clean_filename).unwrap_or_default();
        if name.is_empty() {
            return Err(ShellError::invalid("Please specify the directory name"));
        }
        let path = self.under_current(&name);
        if fs::try_exists(&path).await.unwrap_or(false) {
            return Err(ShellError::refused(format!("Directory already exists: {}", name)));
        }
        fs::create_dir_all(&path).await?;
        tracing::info!("Created directory {:?}", path);
        Ok(format!(
            "📁 **Created directory:** {}\n   └─ Path: `{}`",
            name,
            self.display_path(&path)
        ))
    }

    async fn find_file(&self, matched: &IntentMatch<FileIntent>) -> ShellResult<String> {
        let term = matched
            .entities
            .target()
            .map(clean_filename)
            .unwrap_or_default()
            .to_lowercase();
        if term.is_empty() {
            return Err(ShellError::invalid("Please specify what to search for"));
        }
        let current = self.current_dir();

        let mut results = walk_matching(&current, |name| name == term).await;
        if results.is_empty() {
            results = walk_matching(&current, |name| name.contains(&term)).await;
        }
        if results.is_empty() && term.contains('.') {
            let ext = term.rsplit('.').next().unwrap_or_default().to_string();
            if !ext.is_empty() {
                let suffix = format!(".{}", ext);
                results = walk_matching(&current, |name| name.ends_with(&suffix)).await;
            }
        }

        if results.is_empty() {
            return Ok(format!(
                "🔍 **No files found** matching '{}'\n\n**Suggestions:**\n\
                 • Check the spelling\n• Try a partial name\n\
                 • Search by extension, e.g. \"find .pdf\"",
                term
            ));
        }

        let mut out = format!("🔍 **Found {} file(s)** matching '{}':\n\n", results.len(), term);
        for path in results.iter().take(FIND_LIMIT) {
            let is_dir = fs::metadata(path).await.map(|m| m.is_dir()).unwrap_or(false);
            let shown = path.strip_prefix(&current).unwrap_or(path);
            out.push_str(&format!("{} `{}`\n", file_icon(path, is_dir), shown.display()));
        }
        if results.len() > FIND_LIMIT {
            out.push_str(&format!(
                "\n*(Showing first {} of {} results)*",
                FIND_LIMIT,
                results.len()
            ));
        }
        Ok(out.trim_end().to_string())
    }

    async fn open_file(&self, matched: &IntentMatch<FileIntent>) -> ShellResult<String> {
        let target = matched.entities.target().unwrap_or_default();
        let path = self.resolve_path(target).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.display_path(&path));

        if fs::metadata(&path).await?.is_dir() {
            *self.current.lock() = path.clone();
            tracing::info!("Current directory is now {:?}", path);
            let listing = self.listing(&path).await?;
            return Ok(format!("📁 **Opened directory:** {}\n\n{}", name, listing));
        }

        self.desktop.open_path(&path).await?;
        Ok(format!(
            "📂 **Opened file:** {}\n   └─ Path: `{}`",
            name,
            self.display_path(&path)
        ))
    }

    async fn delete_file(&self, matched: &IntentMatch<FileIntent>) -> ShellResult<String> {
        let target = matched.entities.target().unwrap_or_default();
        let path = self.resolve_path(target).await?;
        if path == self.root {
            return Err(ShellError::refused("The file manager root cannot be deleted"));
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        if fs::metadata(&path).await?.is_dir() {
            let count = count_entries(&path).await?;
            if count > 0 {
                return Err(ShellError::refused(format!(
                    "Directory not empty: {} (contains {} items)",
                    name, count
                )));
            }
            fs::remove_dir(&path).await?;
            tracing::info!("Deleted directory {:?}", path);
            return Ok(format!("🗑️ **Deleted directory:** {}", name));
        }

        fs::remove_file(&path).await?;
        tracing::info!("Deleted file {:?}", path);
        Ok(format!("🗑️ **Deleted file:** {}", name))
    }

    async fn listing(&self, dir: &Path) -> ShellResult<String> {
        let entries = read_entries(dir).await?;
        if entries.is_empty() {
            return Ok(format!("📁 **Empty directory:** `{}`", self.display_path(dir)));
        }

        let mut out = format!("📁 **Directory:** `{}`\n\n", self.display_path(dir));
        for entry in entries.iter().take(LIST_LIMIT) {
            let detail = if entry.is_dir {
                match count_entries(&entry.path).await {
                    Ok(n) => format!("({} items)", n),
                    Err(_) => String::new(),
                }
            } else {
                format_size(entry.size)
            };
            out.push_str(&format!(
                "{} **{}** {}\n",
                file_icon(&entry.path, entry.is_dir),
                entry.name,
                detail
            ));
        }
        if entries.len() > LIST_LIMIT {
            out.push_str(&format!(
                "\n*(Showing first {} of {} items)*",
                LIST_LIMIT,
                entries.len()
            ));
        }
        Ok(out.trim_end().to_string())
    }

    async fn copy_file(&self, matched: &IntentMatch<FileIntent>) -> ShellResult<String> {
        let (source, dest) = self.source_and_destination(matched).await?;
        if fs::try_exists(&dest).await.unwrap_or(false) {
            return Err(ShellError::refused(format!(
                "Destination already exists: {}",
                self.display_path(&dest)
            )));
        }
        let is_dir = fs::metadata(&source).await?.is_dir();
        if is_dir {
            copy_recursive(&source, &dest).await?;
        } else {
            fs::copy(&source, &dest).await?;
        }
        tracing::info!("Copied {:?} to {:?}", source, dest);
        Ok(format!(
            "📋 **Copied {}:** {} → {}",
            if is_dir { "directory" } else { "file" },
            name_of(&source),
            name_of(&dest)
        ))
    }

    async fn move_file(&self, matched: &IntentMatch<FileIntent>) -> ShellResult<String> {
        let (source, dest) = self.source_and_destination(matched).await?;
        fs::rename(&source, &dest).await?;
        tracing::info!("Moved {:?} to {:?}", source, dest);
        Ok(format!("🔄 **Moved:** {} → {}", name_of(&source), name_of(&dest)))
    }

    /// Resolved source plus destination. A destination that is an existing
    /// directory receives the source under its own name.
    async fn source_and_destination(
        &self,
        matched: &IntentMatch<FileIntent>,
    ) -> ShellResult<(PathBuf, PathBuf)> {
        let (Some(source), Some(dest)) = (matched.entities.group(0), matched.entities.group(1))
        else {
            return Err(ShellError::invalid("Please specify a source and a destination"));
        };
        let source = self.resolve_path(source).await?;
        let dest_name = clean_filename(dest);
        if dest_name.is_empty() {
            return Err(ShellError::invalid("Please specify a destination"));
        }
        let mut dest = self.under_current(&dest_name);
        if fs::metadata(&dest).await.map(|m| m.is_dir()).unwrap_or(false) {
            if let Some(file_name) = source.file_name() {
                dest = dest.join(file_name);
            }
        }
        Ok((source, dest))
    }
}

fn name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

#[async_trait]
impl IntentHandler for FileManager {
    type Intent = FileIntent;
    const NAME: &'static str = "files";
    const TITLE: &'static str = "file manager";

    fn engine(&self) -> &IntentEngine<FileIntent> {
        &self.engine
    }

    async fn execute(
        &self,
        matched: &IntentMatch<FileIntent>,
        _raw: &str,
    ) -> ShellResult<String> {
        tracing::debug!(intent = matched.intent.as_str(), "file command");
        match matched.intent {
            FileIntent::CreateFile => self.create_file(matched).await,
            FileIntent::CreateDirectory => self.create_directory(matched).await,
            FileIntent::FindFile => self.find_file(matched).await,
            FileIntent::OpenFile => self.open_file(matched).await,
            FileIntent::DeleteFile => self.delete_file(matched).await,
            FileIntent::ListFiles => self.listing(&self.current_dir()).await,
            FileIntent::CopyFile => self.copy_file(matched).await,
            FileIntent::MoveFile => self.move_file(matched).await,
        }
    }

    fn help(&self, raw: &str) -> String {
        help_text(
            raw,
            "**Here's what I can help you with:**",
            &[
                (
                    "Create Files",
                    &["create a file named notes.txt", "make a folder called projects"],
                ),
                ("Find Files", &["find report.pdf", "where is the file budget"]),
                (
                    "Manage Files",
                    &["open notes.txt", "copy file a.txt to b.txt", "delete old.log", "list files"],
                ),
            ],
        )
    }
}
