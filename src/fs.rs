use anyhow::{Context as _, Error, Result};
use std::fs::{create_dir_all, File, OpenOptions};
use std::io::{self, ErrorKind, Read, Write};
use std::path::Path;

/// Reads the file `f` describes from `directory`, creating it with
/// a freshly generated value if it does not exist yet.
pub(crate) fn read_or_generate<F: GeneratedFile>(directory: &Path, mut f: F) -> Result<F::Value> {
    create_dir_all(directory)
        .with_context(|| format!("failed to create directory {}", directory.display()))?;
    let file_path = directory.join(f.file_name());
    match write(&mut f, &file_path) {
        Err(e) if is_already_exists_error(&e) => read(&f, &file_path),
        result => result,
    }
}

pub(crate) trait GeneratedFile {
    type Value;

    fn generate(&mut self) -> Self::Value;

    fn file_name(&self) -> &'static str;

    fn write(&self, value: &Self::Value, write: &mut dyn Write) -> Result<()>;

    fn read(&self, read: &mut dyn Read) -> Result<Self::Value>;
}

fn read<F: GeneratedFile>(f: &F, file_path: &Path) -> Result<F::Value> {
    f.read(&mut File::open(file_path)?)
        .with_context(|| format!("failed to read {}", file_path.display()))
}

/// Fails with [`ErrorKind::AlreadyExists`] instead of overwriting an existing file.
fn write<F: GeneratedFile>(f: &mut F, file_path: &Path) -> Result<F::Value> {
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(file_path)?;
    let value = f.generate();
    f.write(&value, &mut file)?;
    Ok(value)
}

fn is_already_exists_error(error: &Error) -> bool {
    error
        .chain()
        .filter_map(|cause| cause.downcast_ref::<io::Error>())
        .any(|e| e.kind() == ErrorKind::AlreadyExists)
}
