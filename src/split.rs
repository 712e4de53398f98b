use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// Slices `path` into `<name>.001`, `<name>.002`, ... of at most `chunk_size` bytes each,
/// written next to the source file. The parts are plain byte ranges, `cat` joins them back.
pub async fn split_file(path: &Path, chunk_size: u64) -> io::Result<Vec<PathBuf>> {
    if chunk_size == 0 {
        return Err(io::Error::new(io::ErrorKind::InvalidInput, "chunk size must be positive"));
    }

    let file_name = path
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"))?
        .to_string_lossy()
        .into_owned();

    let mut source = File::open(path).await?;
    let total = source.metadata().await?.len();
    let count = total.div_ceil(chunk_size);

    let mut parts = Vec::new();
    for index in 1..=count {
        let part_path = path.with_file_name(format!("{file_name}.{index:03}"));
        let mut part = File::create(&part_path).await?;

        let mut chunk = (&mut source).take(chunk_size);
        tokio::io::copy(&mut chunk, &mut part).await?;
        part.flush().await?;

        parts.push(part_path);
    }

    Ok(parts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn splits_into_fixed_size_parts() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("clip.mp4");
        let data: Vec<u8> = (0..=255u8).cycle().take(2500).collect();
        std::fs::write(&source, &data).unwrap();

        let parts = split_file(&source, 1000).await.unwrap();

        let names: Vec<_> = parts.iter().map(|p| p.file_name().unwrap().to_string_lossy().into_owned()).collect();
        assert_eq!(names, ["clip.mp4.001", "clip.mp4.002", "clip.mp4.003"]);

        let sizes: Vec<_> = parts.iter().map(|p| std::fs::metadata(p).unwrap().len()).collect();
        assert_eq!(sizes, [1000, 1000, 500]);

        let joined: Vec<u8> = parts.iter().flat_map(|p| std::fs::read(p).unwrap()).collect();
        assert_eq!(joined, data);
    }

    #[tokio::test]
    async fn exact_multiple_has_no_empty_tail() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("clip.mp4");
        std::fs::write(&source, vec![7u8; 2000]).unwrap();

        let parts = split_file(&source, 1000).await.unwrap();
        assert_eq!(parts.len(), 2);
    }

    #[tokio::test]
    async fn empty_file_has_no_parts() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("empty.mp4");
        std::fs::write(&source, b"").unwrap();

        assert!(split_file(&source, 1000).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn zero_chunk_size_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("clip.mp4");
        std::fs::write(&source, b"data").unwrap();

        let err = split_file(&source, 0).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }
}
