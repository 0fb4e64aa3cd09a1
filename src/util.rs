use std::io;
use std::path::Path;

/// Pairs every item with its predecessor and successor:
/// `[1, 2, 3]` -> `(None, 1, Some(2))`, `(Some(1), 2, Some(3))`,
/// `(Some(2), 3, None)`.
pub fn neighbours<T>(items: &[T]) -> Vec<(Option<&T>, &T, Option<&T>)> {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| (i.checked_sub(1).map(|p| &items[p]), item, items.get(i + 1)))
        .collect()
}

/// Removes `dir` and everything under it. A missing directory is fine.
pub fn rmdir(dir: &Path) -> io::Result<()> {
    match std::fs::remove_dir_all(dir) {
        Ok(x) => Ok(x),
        Err(e) => match e.kind() {
            io::ErrorKind::NotFound => Ok(()),
            _ => Err(e),
        },
    }
}
