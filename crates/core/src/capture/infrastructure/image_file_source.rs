use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;

use crate::capture::domain::frame_source::FrameSource;
use crate::shared::constants::IMAGE_EXTENSIONS;
use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum FrameSourceError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{} is not a recognizable image", .0.display())]
    NotAnImage(PathBuf),
    #[error("no image files found in {}", .0.display())]
    Empty(PathBuf),
}

/// Serves frames from image files on disk.
///
/// A single file yields the same snapshot on every capture; a directory
/// yields its images in sorted order, wrapping around, which stands in
/// for a camera when driving a session without one.
pub struct ImageFileSource {
    frames: Vec<Vec<u8>>,
    captures: AtomicU64,
}

impl ImageFileSource {
    pub fn open(path: &Path) -> Result<Self, FrameSourceError> {
        let files = if path.is_dir() {
            list_images(path)?
        } else {
            vec![path.to_path_buf()]
        };
        if files.is_empty() {
            return Err(FrameSourceError::Empty(path.to_path_buf()));
        }

        let mut frames = Vec::with_capacity(files.len());
        for file in files {
            let bytes = fs::read(&file).map_err(|e| FrameSourceError::Read {
                path: file.clone(),
                source: e,
            })?;
            if image::guess_format(&bytes).is_err() {
                return Err(FrameSourceError::NotAnImage(file));
            }
            frames.push(bytes);
        }
        log::debug!("Loaded {} frame(s) from {}", frames.len(), path.display());

        Ok(Self {
            frames,
            captures: AtomicU64::new(0),
        })
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl FrameSource for ImageFileSource {
    fn capture(&self) -> Option<Frame> {
        let index = self.captures.fetch_add(1, Ordering::Relaxed);
        let bytes = &self.frames[(index % self.frames.len() as u64) as usize];
        Frame::from_encoded(bytes.clone(), index)
    }
}

fn list_images(dir: &Path) -> Result<Vec<PathBuf>, FrameSourceError> {
    let entries = fs::read_dir(dir).map_err(|e| FrameSourceError::Read {
        path: dir.to_path_buf(),
        source: e,
    })?;
    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && has_image_extension(p))
        .collect();
    files.sort();
    Ok(files)
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}
