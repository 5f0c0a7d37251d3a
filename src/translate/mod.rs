//! translate
//!
//! Object Translator: git views → JSON shapes.
//!
//! Every function here is pure. Content that may be binary passes through a
//! [`BinaryClassifier`] and comes out either as normalized UTF-8 text or as
//! `""`.
//!
//! # Shapes
//!
//! Every shape carries a `type` discriminator. Tree entries are a tagged enum
//! so a client can branch on `type` without guessing from other fields.

use chrono::{DateTime, FixedOffset};
use serde::Serialize;

use crate::content::{to_display_text, BinaryClassifier};
use crate::core::types::{ObjectKind, Oid};
use crate::git::{
    BlameHunkInfo, BlobData, BranchEntry, CommitInfo, DiffEntry, DiffStatus, PathObject,
    RefEntry, SignatureInfo, TagInfo, TreeEntryInfo, TreeListing,
};

/// `{ path }`
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RepositoryJson {
    pub path: String,
}

/// One entry of a tree listing.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TreeEntryJson {
    Blob { name: String, sha: String },
    Tree { name: String, sha: String },
    /// Submodule gitlink
    Commit { name: String, sha: String },
}

/// `{ files, sha }`, tagged `"tree"` by [`ObjectJson`].
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TreeJson {
    pub files: Vec<TreeEntryJson>,
    pub sha: String,
}

/// `{ name, sha, data }`, tagged `"blob"` by [`ObjectJson`].
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct BlobJson {
    pub name: String,
    pub sha: String,
    /// Display text, `""` when the content is binary
    pub data: String,
}

/// A tree or a blob, as found at a path.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ObjectJson {
    Tree(TreeJson),
    Blob(BlobJson),
}

/// `{ name, commit_sha, type: "head" }`
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct HeadJson {
    pub name: String,
    pub commit_sha: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
}

/// `{ ref, sha, type }` where `type` is the target's kind.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RefJson {
    #[serde(rename = "ref")]
    pub name: String,
    pub sha: String,
    #[serde(rename = "type")]
    pub kind: ObjectKind,
}

/// `{ sha, type }`: confirmation of a created object or ref target.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ObjectRefJson {
    pub sha: String,
    #[serde(rename = "type")]
    pub kind: ObjectKind,
}

/// `{ commit_sha, type: "commit" }`: result of a file write.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CommitShaJson {
    pub commit_sha: String,
    #[serde(rename = "type")]
    pub kind: ObjectKind,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ParentJson {
    pub id: String,
}

/// `{ name, email }`
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PersonJson {
    pub name: String,
    pub email: String,
}

/// `{ name, email, date }`
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DatedPersonJson {
    pub name: String,
    pub email: String,
    pub date: DateTime<FixedOffset>,
}

/// A full commit.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CommitJson {
    pub id: String,
    pub parents: Vec<ParentJson>,
    pub tree: String,
    pub message: String,
    pub author: PersonJson,
    pub committer: PersonJson,
    pub authored_date: DateTime<FixedOffset>,
    pub committed_date: DateTime<FixedOffset>,
    #[serde(rename = "type")]
    pub kind: ObjectKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diffs: Option<Vec<DiffJson>>,
}

/// One file-level change.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DiffJson {
    pub a_path: Option<String>,
    pub b_path: Option<String>,
    pub a_mode: Option<String>,
    pub b_mode: Option<String>,
    pub new_file: bool,
    pub deleted_file: bool,
    pub renamed_file: bool,
    pub similarity_index: u32,
    /// Patch text, `""` when either side is binary
    pub diff: String,
}

/// An annotated or lightweight tag.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TagJson {
    pub tag: String,
    pub sha: String,
    pub object: ObjectRefJson,
    pub message: Option<String>,
    pub tagger: Option<DatedPersonJson>,
    #[serde(rename = "type")]
    pub kind: ObjectKind,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct BlameHunkJson {
    pub commit_sha: String,
    pub start_line: usize,
    pub line_count: usize,
    pub author: PersonJson,
    pub lines: Vec<String>,
}

/// `{ path, hunks, type: "blame" }`
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct BlameJson {
    pub path: String,
    pub hunks: Vec<BlameHunkJson>,
    #[serde(rename = "type")]
    pub kind: &'static str,
}

// =============================================================================
// Translation
// =============================================================================

pub fn repository(path: &std::path::Path) -> RepositoryJson {
    RepositoryJson {
        path: path.display().to_string(),
    }
}

fn tree_entry(entry: &TreeEntryInfo) -> TreeEntryJson {
    let name = entry.name.clone();
    let sha = entry.oid.to_string();
    match entry.kind {
        ObjectKind::Tree => TreeEntryJson::Tree { name, sha },
        ObjectKind::Commit => TreeEntryJson::Commit { name, sha },
        ObjectKind::Blob | ObjectKind::Tag => TreeEntryJson::Blob { name, sha },
    }
}

pub fn tree(listing: &TreeListing) -> TreeJson {
    TreeJson {
        files: listing.entries.iter().map(tree_entry).collect(),
        sha: listing.oid.to_string(),
    }
}

/// Classify and convert content for display.
fn display(classifier: &dyn BinaryClassifier, name: Option<&str>, content: &[u8]) -> String {
    if classifier.is_binary(name, content) {
        String::new()
    } else {
        to_display_text(content)
    }
}

/// A blob; blobs looked up by hash are named by their hash.
///
/// A hash lookup carries no filename, so only content sniffing decides
/// whether it is binary. The extension tiers apply to path lookups.
pub fn blob(blob: &BlobData, classifier: &dyn BinaryClassifier) -> BlobJson {
    BlobJson {
        name: blob.name.clone().unwrap_or_else(|| blob.oid.to_string()),
        sha: blob.oid.to_string(),
        data: display(classifier, blob.name.as_deref(), &blob.content),
    }
}

pub fn object(object: &PathObject, classifier: &dyn BinaryClassifier) -> ObjectJson {
    match object {
        PathObject::Tree(listing) => ObjectJson::Tree(tree(listing)),
        PathObject::Blob(data) => ObjectJson::Blob(blob(data, classifier)),
    }
}

pub fn head(branch: &BranchEntry) -> HeadJson {
    HeadJson {
        name: branch.name.to_string(),
        commit_sha: branch.oid.to_string(),
        kind: "head",
    }
}

pub fn reference(entry: &RefEntry) -> RefJson {
    RefJson {
        name: entry.name.to_string(),
        sha: entry.oid.to_string(),
        kind: entry.kind,
    }
}

pub fn object_ref(oid: &Oid, kind: ObjectKind) -> ObjectRefJson {
    ObjectRefJson {
        sha: oid.to_string(),
        kind,
    }
}

pub fn commit_sha(oid: &Oid) -> CommitShaJson {
    CommitShaJson {
        commit_sha: oid.to_string(),
        kind: ObjectKind::Commit,
    }
}

fn person(sig: &SignatureInfo) -> PersonJson {
    PersonJson {
        name: sig.name.clone(),
        email: sig.email.clone(),
    }
}

fn dated_person(sig: &SignatureInfo) -> DatedPersonJson {
    DatedPersonJson {
        name: sig.name.clone(),
        email: sig.email.clone(),
        date: sig.time,
    }
}

/// A commit, with diffs attached when `diffs` is given.
pub fn commit(
    info: &CommitInfo,
    diffs: Option<&[DiffEntry]>,
    classifier: &dyn BinaryClassifier,
) -> CommitJson {
    CommitJson {
        id: info.oid.to_string(),
        parents: info
            .parents
            .iter()
            .map(|p| ParentJson { id: p.to_string() })
            .collect(),
        tree: info.tree.to_string(),
        message: info.message.clone(),
        author: person(&info.author),
        committer: person(&info.committer),
        authored_date: info.author.time,
        committed_date: info.committer.time,
        kind: ObjectKind::Commit,
        diffs: diffs.map(|entries| entries.iter().map(|d| diff(d, classifier)).collect()),
    }
}

/// A diff entry; the patch is emptied when either side is binary.
pub fn diff(entry: &DiffEntry, classifier: &dyn BinaryClassifier) -> DiffJson {
    let side_binary = |path: Option<&str>, content: Option<&[u8]>| match (path, content) {
        (_, Some(bytes)) => classifier.is_binary(path, bytes),
        (Some(path), None) => classifier.is_binary(Some(path), b""),
        (None, None) => false,
    };
    let binary = side_binary(entry.old_path.as_deref(), entry.old_content.as_deref())
        || side_binary(entry.new_path.as_deref(), entry.new_content.as_deref());

    DiffJson {
        a_path: entry.old_path.clone(),
        b_path: entry.new_path.clone(),
        a_mode: entry.old_mode.clone(),
        b_mode: entry.new_mode.clone(),
        new_file: entry.status == DiffStatus::Added,
        deleted_file: entry.status == DiffStatus::Deleted,
        renamed_file: entry.status == DiffStatus::Renamed,
        similarity_index: entry.similarity,
        diff: if binary {
            String::new()
        } else {
            to_display_text(&entry.patch)
        },
    }
}

pub fn tag(info: &TagInfo) -> TagJson {
    TagJson {
        tag: info.name.clone(),
        sha: info.ref_target.to_string(),
        object: object_ref(&info.object, info.object_kind),
        message: info.message.clone(),
        tagger: info.tagger.as_ref().map(dated_person),
        kind: ObjectKind::Tag,
    }
}

/// Blame of `file`; a binary file yields hunks without lines.
pub fn blame(
    path: &str,
    file: &BlobData,
    hunks: &[BlameHunkInfo],
    classifier: &dyn BinaryClassifier,
) -> BlameJson {
    let binary = classifier.is_binary(Some(path), &file.content);
    BlameJson {
        path: path.to_string(),
        hunks: hunks
            .iter()
            .map(|hunk| BlameHunkJson {
                commit_sha: hunk.commit.to_string(),
                start_line: hunk.start_line,
                line_count: hunk.line_count,
                author: person(&hunk.author),
                lines: if binary {
                    Vec::new()
                } else {
                    hunk.lines.iter().map(|l| to_display_text(l)).collect()
                },
            })
            .collect(),
        kind: "blame",
    }
}
