use crate::fs::{read_or_generate, GeneratedFile};
use anyhow::{ensure, Result};
use rand::Rng;
use std::io;
use std::path::Path;

/// The key Rocket encrypts private cookies with.
/// Sessions survive restarts as long as this file is kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SessionKey(pub(crate) Vec<u8>);

const KEY_LENGTH: usize = 64;
const PEM_LABEL: &str = "PALATE SESSION KEY";

impl SessionKey {
    pub(crate) fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut bytes = vec![0; KEY_LENGTH];
        rng.fill_bytes(&mut bytes);
        SessionKey(bytes)
    }

    pub(crate) fn read_or_generate<R: Rng>(directory: impl AsRef<Path>, rng: &mut R) -> Result<Self> {
        read_or_generate(directory.as_ref(), SessionKeyFile(rng))
    }
}

struct SessionKeyFile<'a, R>(&'a mut R);

impl<R: Rng> GeneratedFile for SessionKeyFile<'_, R> {
    type Value = SessionKey;

    fn generate(&mut self) -> Self::Value {
        SessionKey::generate(self.0)
    }

    fn file_name(&self) -> &'static str {
        "session-key.pem"
    }

    fn write(&self, value: &Self::Value, write: &mut dyn io::Write) -> Result<()> {
        let pem = pem::encode_string(PEM_LABEL, pem::LineEnding::LF, &value.0)?;
        Ok(write.write_all(pem.as_bytes())?)
    }

    fn read(&self, read: &mut dyn io::Read) -> Result<Self::Value> {
        let mut pem = Vec::new();
        read.read_to_end(&mut pem)?;
        let (label, key) = pem::decode_vec(&pem)?;
        ensure!(label == PEM_LABEL, "unexpected PEM label {label:?} in session key file");
        ensure!(key.len() == KEY_LENGTH, "session key must be {KEY_LENGTH} bytes");
        Ok(SessionKey(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;
    use std::env::temp_dir;
    use std::fs::remove_dir_all;

    #[test]
    fn key_is_generated_once_and_then_reused() {
        let directory = temp_dir().join(format!("palate-session-key-{}", std::process::id()));
        let mut rng = SmallRng::seed_from_u64(5);
        let generated = SessionKey::read_or_generate(&directory, &mut rng).unwrap();
        let read = SessionKey::read_or_generate(&directory, &mut rng).unwrap();
        remove_dir_all(&directory).unwrap();
        assert_eq!(KEY_LENGTH, generated.0.len());
        assert_eq!(generated, read);
    }

    #[test]
    fn rejects_keys_with_a_foreign_label() {
        let mut rng = SmallRng::seed_from_u64(5);
        let pem = pem::encode_string("SOMETHING ELSE", pem::LineEnding::LF, &[0; KEY_LENGTH]).unwrap();
        let file = SessionKeyFile(&mut rng);
        assert!(file.read(&mut pem.as_bytes()).is_err());
    }
}
