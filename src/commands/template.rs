use crate::commands::Out;
use crate::import::write_template;
use crate::model::ImportKind;
use crate::{utils, Result};
use std::path::{Path, PathBuf};

/// Writes the sample CSV for `kind` into `out_dir`, creating the directory if needed.
pub async fn template(kind: ImportKind, out_dir: &Path) -> Result<Out<PathBuf>> {
    utils::make_dir(out_dir).await?;
    let path = write_template(kind, out_dir).await?;
    Ok(Out::new(
        format!("Wrote the {kind} template to {}", path.display()),
        path,
    ))
}
