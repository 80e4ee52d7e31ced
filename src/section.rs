//! Line-oriented editing of a single `[section]` in an INI-like file.
//!
//! Only the target section is touched; every other byte of the file is kept as is. The file is
//! never round-tripped through a parser, so comments and formatting elsewhere survive.
//!
//! [`replace_section`] is a delete followed by an append, not an atomic swap: a process
//! interrupted between the two steps leaves the section missing.

fn header_for(name: &str) -> String {
    format!("[{name}]")
}

/// Remove `[name]` and its lines up to the next section header or end of file.
///
/// Returns whether anything was removed. A missing file or missing section is a no-op and the
/// file is left untouched.
pub async fn delete_section(
    path: &std::path::Path,
    name: &str,
) -> Result<bool, crate::error::Error> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(v) => v,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e.into()),
    };

    let header = header_for(name);
    let mut retained = String::with_capacity(content.len());
    let mut suppressing = false;
    let mut found = false;

    for line in content.split_inclusive('\n') {
        let bare = line.trim_end_matches(['\r', '\n']);
        if bare == header {
            suppressing = true;
            found = true;
            continue;
        }
        if suppressing && line.starts_with('[') {
            suppressing = false;
        }
        if !suppressing {
            retained.push_str(line);
        }
    }

    if !found {
        tracing::trace!(message = "Section not present; nothing to delete", path = ?path, section = %name);
        return Ok(false);
    }

    write_truncate(path, retained.as_bytes()).await?;
    tracing::debug!(message = "Deleted section", path = ?path, section = %name);
    Ok(true)
}

/// Append `[name]` with one `key = value` line per entry, in order.
///
/// A non-empty file gets exactly one blank line between its last line and the new header. The
/// file (and its parent directory) is created when missing.
pub async fn append_section(
    path: &std::path::Path,
    name: &str,
    settings: &crate::profile::Settings,
) -> Result<(), crate::error::Error> {
    use tokio::io::AsyncWriteExt;

    let existing = match tokio::fs::read(path).await {
        Ok(v) => v,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            ensure_parent_dir(path).await?;
            Vec::new()
        }
        Err(e) => return Err(e.into()),
    };

    let mut buf = String::from(separator_for(&existing));
    buf.push_str(&header_for(name));
    buf.push('\n');
    for (k, v) in settings.iter() {
        buf.push_str(&format!("{k} = {v}\n"));
    }

    let mut file = open_options().append(true).create(true).open(path).await?;
    file.write_all(buf.as_bytes()).await?;
    file.flush().await?;

    tracing::debug!(message = "Appended section", path = ?path, section = %name, keys = settings.len());
    Ok(())
}

/// [`delete_section`] then [`append_section`].
pub async fn replace_section(
    path: &std::path::Path,
    name: &str,
    settings: &crate::profile::Settings,
) -> Result<(), crate::error::Error> {
    delete_section(path, name).await?;
    append_section(path, name, settings).await
}

/// What to write before a new header so that exactly one blank line precedes it.
fn separator_for(existing: &[u8]) -> &'static str {
    match existing {
        [] => "",
        [b'\n'] => "",
        [_] => "\n\n",
        [.., b'\n', b'\n'] | [.., b'\n', b'\r', b'\n'] => "",
        [.., b'\n'] => "\n",
        _ => "\n\n",
    }
}

async fn write_truncate(path: &std::path::Path, content: &[u8]) -> Result<(), crate::error::Error> {
    use tokio::io::AsyncWriteExt;

    let mut file = open_options()
        .write(true)
        .truncate(true)
        .open(path)
        .await?;
    file.write_all(content).await?;
    file.flush().await?;
    Ok(())
}

fn open_options() -> tokio::fs::OpenOptions {
    let mut opts = tokio::fs::OpenOptions::new();
    #[cfg(unix)]
    opts.mode(0o600);
    opts
}

async fn ensure_parent_dir(path: &std::path::Path) -> Result<(), crate::error::Error> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    Ok(())
}
