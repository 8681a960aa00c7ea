//! Driver version tagging of test class names.
//!
//! Reports from several driver versions end up in the same result store, so
//! every `classname="X"` is rewritten to `classname="<tag>.X"` before the
//! report is parsed. This is a plain text rewrite of the file and must not
//! run while the same file is being aggregated.

use std::path::Path;

use quick_xml::escape::escape;
use tracing::info;

use crate::writer::write_atomic;
use crate::{ReportError, Result};

const CLASSNAME_MARKER: &str = "classname=\"";

/// Prefix every class name in `text` with `tag`.
///
/// A file is either tagged as a whole or not at all: when every class name
/// already starts with `<tag>.` the text is returned unchanged, otherwise
/// every class name gets the prefix, including ones that happen to start
/// with it (a namespace equal to the tag). A file whose untagged class names
/// all start with `<tag>.` is indistinguishable from a tagged one and is left
/// alone. Returns the rewritten text and the number of class names tagged.
pub fn tag_classnames_str(text: &str, tag: &str) -> (String, usize) {
    let prefix = format!("{}.", escape(tag));
    let already_tagged = text
        .match_indices(CLASSNAME_MARKER)
        .all(|(idx, marker)| text[idx + marker.len()..].starts_with(&prefix));
    if already_tagged {
        return (text.to_string(), 0);
    }

    let mut out = String::with_capacity(text.len() + prefix.len() * 8);
    let mut rest = text;
    let mut tagged = 0;
    while let Some(idx) = rest.find(CLASSNAME_MARKER) {
        let split = idx + CLASSNAME_MARKER.len();
        out.push_str(&rest[..split]);
        out.push_str(&prefix);
        rest = &rest[split..];
        tagged += 1;
    }
    out.push_str(rest);
    (out, tagged)
}

/// Tag the class names of the report file at `path` in place.
pub fn tag_classnames(path: &Path, tag: &str) -> Result<usize> {
    if !path.is_file() {
        return Err(ReportError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let text = std::fs::read_to_string(path).map_err(|e| ReportError::io(path, e))?;
    let (updated, tagged) = tag_classnames_str(&text, tag);
    if tagged > 0 {
        write_atomic(path, updated.as_bytes())?;
    }

    info!(
        target: "report.classnames_tagged",
        path = %path.display(),
        tag,
        tagged,
        "Updated testcase classnames with driver version"
    );
    Ok(tagged)
}
