use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use std::io;

/// A single input file discovered during traversal, paired with the
/// directory it lives in relative to the traversal root.
///
/// Ephemeral: produced by [`TreeWalker`], consumed by the driver's per-file
/// step, then discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTask {
    /// Absolute path of the input file.
    pub input: Utf8PathBuf,

    /// Directory containing the file, relative to the traversal root.
    /// Empty for files directly under the root.
    pub relative_dir: Utf8PathBuf,
}

/// One step of a tree traversal, in visit order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeItem {
    /// A subdirectory was entered; the path is relative to the root. The
    /// driver mirrors it under the output root before any file beneath it
    /// is processed. The root itself is never yielded.
    Directory(Utf8PathBuf),

    /// A file whose name matched the suffix filter.
    File(FileTask),
}

/// Lazy depth-first walk of an input tree.
///
/// Directory entries are sorted by name (case-sensitive, byte order) before
/// visiting, and subdirectories are descended in place, so the sequence is
/// fully deterministic for a given tree: alphabetical within each directory,
/// depth-first across directories. Files not matching the suffix filter are
/// skipped silently.
///
/// The walker performs no side effects beyond reading directory listings;
/// all directory creation and file I/O belongs to the consumer. The sequence
/// is finite and non-restartable. Symbolic-link cycles are not handled.
///
/// Failing to list a subdirectory yields an `Err` item and the walk
/// continues with the subdirectory's siblings; failing to list the root
/// fails construction.
pub struct TreeWalker {
    suffix: String,
    stack: Vec<Frame>,
}

struct Frame {
    rel: Utf8PathBuf,
    entries: std::vec::IntoIter<Utf8PathBuf>,
}

impl TreeWalker {
    /// Start a walk rooted at `root`.
    ///
    /// # Errors
    ///
    /// Fails if the root directory cannot be listed.
    pub fn new(root: &Utf8Path, suffix: &str) -> io::Result<TreeWalker> {
        let entries = read_sorted(root)?;
        Ok(TreeWalker {
            suffix: suffix.to_string(),
            stack: vec![Frame {
                rel: Utf8PathBuf::new(),
                entries: entries.into_iter(),
            }],
        })
    }
}

impl Iterator for TreeWalker {
    type Item = io::Result<TreeItem>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let frame = self.stack.last_mut()?;
            let Some(path) = frame.entries.next() else {
                self.stack.pop();
                continue;
            };

            let Some(name) = path.file_name() else {
                continue;
            };

            if path.is_dir() {
                let rel_child = frame.rel.join(name);
                match read_sorted(&path) {
                    Ok(children) => {
                        self.stack.push(Frame {
                            rel: rel_child.clone(),
                            entries: children.into_iter(),
                        });
                        return Some(Ok(TreeItem::Directory(rel_child)));
                    }
                    Err(err) => return Some(Err(err)),
                }
            } else if name.ends_with(&self.suffix) {
                let relative_dir = frame.rel.clone();
                return Some(Ok(TreeItem::File(FileTask {
                    input: path,
                    relative_dir,
                })));
            }
            // Non-matching file: skip
        }
    }
}

/// List a directory's entries as UTF-8 paths, sorted by name.
fn read_sorted(dir: &Utf8Path) -> io::Result<Vec<Utf8PathBuf>> {
    let mut entries = Vec::new();

    let listing = fs::read_dir(dir)
        .map_err(|e| io::Error::new(e.kind(), format!("cannot list {}: {}", dir, e)))?;

    for entry in listing {
        let entry =
            entry.map_err(|e| io::Error::new(e.kind(), format!("cannot list {}: {}", dir, e)))?;
        let path = Utf8PathBuf::from_path_buf(entry.path()).map_err(|p| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("non-UTF-8 path under {}: {}", dir, p.display()),
            )
        })?;
        entries.push(path);
    }

    entries.sort();
    Ok(entries)
}
