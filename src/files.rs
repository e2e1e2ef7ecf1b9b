//! Whole-file hashing helpers.

use std::fs::File;
use std::io::{self, Read};

use thiserror::Error;

use crate::spec::{Spec, SpecError, KECCAK_SUFFIX, RAWSHAKE_SUFFIX, SHA3_SUFFIX, SHAKE_SUFFIX};
use crate::sponge::KeccakState;

/// Upper bound on the read buffer, whatever the filesystem reports.
const CHUNK_LIMIT: usize = 64 * 1024;

/// A whole-file hashing operation failed.
#[derive(Debug, Error)]
pub enum SumError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Spec(#[from] SpecError),
}

/// Hash the whole of `fd` into `state` and finalise with `suffix`.
///
/// The file is read in blocks sized from the filesystem-reported block
/// size, rounded to a whole number of sponge blocks; interrupted reads are
/// retried. With `hashsum` absent the state is advanced for later
/// squeezing, as in [`KeccakState::digest`].
pub fn generalised_sum_fd(
    fd: &mut File,
    state: &mut KeccakState,
    suffix: &str,
    hashsum: Option<&mut [u8]>,
) -> io::Result<()> {
    let chunksize = state.zerocopy_chunksize();
    let extrasize = (suffix.len() + 2 + 7) / 8;
    let extrachunks = (extrasize + chunksize - 1) / chunksize;

    let mut blksize = fs_block_size(fd);
    if blksize % chunksize != 0 {
        blksize += chunksize - blksize % chunksize;
    }
    blksize = blksize.max((extrachunks + 1) * chunksize);
    if blksize > CHUNK_LIMIT {
        blksize = (CHUNK_LIMIT - CHUNK_LIMIT % chunksize).max(chunksize);
    }

    let mut chunk = vec![0u8; blksize];
    let mut offset = 0;
    loop {
        match fd.read(&mut chunk[offset..]) {
            Ok(0) => break,
            Ok(got) => {
                offset += got;
                if offset == blksize {
                    state.zerocopy_update(&chunk);
                    offset = 0;
                }
            }
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        }
    }

    // make sure the final buffer has room for the suffix and the pad
    if extrasize > blksize - offset {
        let residue = offset % chunksize;
        state.zerocopy_update(&chunk[..offset - residue]);
        chunk.copy_within(offset - residue..offset, 0);
        offset = residue;
    }

    chunk.truncate(offset);
    state.zerocopy_digest(&mut chunk, 0, suffix, hashsum);
    Ok(())
}

/// Hash the whole of `fd` with Keccak\[r, c, n\] as given by `spec`,
/// returning the state for continued squeezing.
pub fn keccaksum_fd(
    fd: &mut File,
    spec: &Spec,
    hashsum: Option<&mut [u8]>,
) -> Result<KeccakState, SumError> {
    let mut state = KeccakState::new(spec)?;
    generalised_sum_fd(fd, &mut state, KECCAK_SUFFIX, hashsum)?;
    Ok(state)
}

/// Hash the whole of `fd` with SHA3-`output`, returning the state for
/// continued squeezing.
pub fn sha3sum_fd(
    fd: &mut File,
    output: i64,
    hashsum: Option<&mut [u8]>,
) -> Result<KeccakState, SumError> {
    let mut state = KeccakState::new(&Spec::sha3(output))?;
    generalised_sum_fd(fd, &mut state, SHA3_SUFFIX, hashsum)?;
    Ok(state)
}

/// Hash the whole of `fd` with RawSHAKE-`semicapacity` and an `output`-bit
/// digest, returning the state for continued squeezing.
pub fn rawshakesum_fd(
    fd: &mut File,
    semicapacity: i64,
    output: i64,
    hashsum: Option<&mut [u8]>,
) -> Result<KeccakState, SumError> {
    let mut state = KeccakState::new(&Spec::rawshake(semicapacity, output))?;
    generalised_sum_fd(fd, &mut state, RAWSHAKE_SUFFIX, hashsum)?;
    Ok(state)
}

/// Hash the whole of `fd` with SHAKE-`semicapacity` and an `output`-bit
/// digest, returning the state for continued squeezing.
pub fn shakesum_fd(
    fd: &mut File,
    semicapacity: i64,
    output: i64,
    hashsum: Option<&mut [u8]>,
) -> Result<KeccakState, SumError> {
    let mut state = KeccakState::new(&Spec::shake(semicapacity, output))?;
    generalised_sum_fd(fd, &mut state, SHAKE_SUFFIX, hashsum)?;
    Ok(state)
}

#[cfg(unix)]
fn fs_block_size(fd: &File) -> usize {
    use std::os::unix::fs::MetadataExt;
    match fd.metadata() {
        Ok(metadata) if metadata.blksize() > 0 => metadata.blksize() as usize,
        _ => 4096,
    }
}

#[cfg(not(unix))]
fn fs_block_size(_fd: &File) -> usize {
    4096
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hex::behex_lower;
    use std::fs;
    use std::path::PathBuf;

    struct TempFile(PathBuf);

    impl TempFile {
        fn with_contents(name: &str, contents: &[u8]) -> Self {
            let path = std::env::temp_dir().join(format!(
                "keccak-sponge-{}-{name}",
                std::process::id()
            ));
            fs::write(&path, contents).unwrap();
            TempFile(path)
        }

        fn open(&self) -> File {
            File::open(&self.0).unwrap()
        }
    }

    impl Drop for TempFile {
        fn drop(&mut self) {
            let _ = fs::remove_file(&self.0);
        }
    }

    fn reference_hex(spec: &Spec, suffix: &str, msg: &[u8]) -> String {
        let mut state = KeccakState::new(spec).unwrap();
        let mut hashsum = vec![0u8; (state.output() + 7) / 8];
        state.digest(msg, 0, suffix, Some(&mut hashsum));
        behex_lower(&hashsum)
    }

    #[test]
    fn file_digest_matches_memory_digest() {
        let contents = vec![0x5eu8; 200_000];
        let file = TempFile::with_contents("large", &contents);

        let mut hashsum = [0u8; 32];
        sha3sum_fd(&mut file.open(), 256, Some(&mut hashsum)).unwrap();
        assert_eq!(
            behex_lower(&hashsum),
            reference_hex(&Spec::sha3(256), SHA3_SUFFIX, &contents)
        );
    }

    #[test]
    fn empty_file() {
        let file = TempFile::with_contents("empty", b"");
        let mut hashsum = [0u8; 32];
        sha3sum_fd(&mut file.open(), 256, Some(&mut hashsum)).unwrap();
        assert_eq!(
            behex_lower(&hashsum),
            "a7ffc6f8bf1ed76651c14756a061d662f580ff4de43b49fa82d80a4b80f8434a"
        );
    }

    #[test]
    fn every_mode_wrapper_agrees_with_the_core() {
        let contents = b"faktum desist thundered klen";
        let file = TempFile::with_contents("modes", contents);

        let mut hashsum = [0u8; 32];
        keccaksum_fd(&mut file.open(), &Spec::sha3(256), Some(&mut hashsum)).unwrap();
        assert_eq!(
            behex_lower(&hashsum),
            reference_hex(&Spec::sha3(256), KECCAK_SUFFIX, contents)
        );

        let mut hashsum = [0u8; 16];
        rawshakesum_fd(&mut file.open(), 256, 128, Some(&mut hashsum)).unwrap();
        assert_eq!(
            behex_lower(&hashsum),
            reference_hex(&Spec::rawshake(256, 128), RAWSHAKE_SUFFIX, contents)
        );

        let mut hashsum = [0u8; 16];
        shakesum_fd(&mut file.open(), 256, 128, Some(&mut hashsum)).unwrap();
        assert_eq!(
            behex_lower(&hashsum),
            reference_hex(&Spec::shake(256, 128), SHAKE_SUFFIX, contents)
        );
    }

    #[test]
    fn file_sizes_around_the_buffer_boundary() {
        let spec = Spec::sha3(224);
        let chunksize = KeccakState::new(&spec).unwrap().zerocopy_chunksize();
        for extra in [0usize, 1, chunksize - 1, chunksize] {
            let contents = vec![0xa3u8; CHUNK_LIMIT - CHUNK_LIMIT % chunksize + extra];
            let file = TempFile::with_contents(&format!("boundary-{extra}"), &contents);
            let mut hashsum = [0u8; 28];
            sha3sum_fd(&mut file.open(), 224, Some(&mut hashsum)).unwrap();
            assert_eq!(
                behex_lower(&hashsum),
                reference_hex(&spec, SHA3_SUFFIX, &contents),
                "{extra} bytes past the buffer boundary"
            );
        }
    }

    #[test]
    fn continued_squeezing_after_a_file() {
        let contents = b"splay washbasin opposing there";
        let file = TempFile::with_contents("squeeze", contents);

        let mut first = [0u8; 64];
        let mut state = shakesum_fd(&mut file.open(), 256, 512, Some(&mut first)).unwrap();
        let mut second = [0u8; 64];
        state.squeeze(&mut second);

        let mut reference = KeccakState::new(&Spec::shake(256, 512)).unwrap();
        let mut expected_first = [0u8; 64];
        reference.digest(contents, 0, SHAKE_SUFFIX, Some(&mut expected_first));
        let mut expected_second = [0u8; 64];
        reference.squeeze(&mut expected_second);

        assert_eq!(first, expected_first);
        assert_eq!(second, expected_second);
    }
}
