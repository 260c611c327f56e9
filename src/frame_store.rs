// THEORY:
// The `frame_store` module is the boundary between the tracker and the external
// decode/encode steps. Those steps communicate through a directory of numbered
// image files; this module turns that directory into an ordered, indexable
// sequence of frames and writes annotated frames back over the originals.
//
// Frame order is temporal order, so it is load-bearing: the last run of digits in
// each file stem is compared numerically (`frame_9` before `frame_10`), and names
// without a number, or with equal numbers, fall back to plain lexicographic order.

use crate::core_modules::frame::Frame;
use crate::error::TrackError;
use image::ImageFormat;
use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const FRAME_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

/// An ordered directory of frame images.
#[derive(Debug, Clone)]
pub struct FrameDirectory {
    root: PathBuf,
    files: Vec<PathBuf>,
}

impl FrameDirectory {
    /// Lists the frame images in `root` in frame order.
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self, TrackError> {
        let root = root.as_ref().to_path_buf();
        let mut files = Vec::new();
        for entry in fs::read_dir(&root)? {
            let path = entry?.path();
            if path.is_file() && is_frame_file(&path) {
                files.push(path);
            }
        }
        files.sort_by(|a, b| frame_order(a, b));
        debug!(root = %root.display(), frames = files.len(), "opened frame directory");
        Ok(Self { root, files })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn path(&self, index: usize) -> Option<&Path> {
        self.files.get(index).map(PathBuf::as_path)
    }

    /// Decodes frame `index` as 8-bit RGB.
    pub fn load(&self, index: usize) -> Result<Frame, TrackError> {
        load_frame(self.existing_path(index)?)
    }

    /// Encodes `frame` over the file of frame `index`, in that file's format.
    pub fn save(&self, index: usize, frame: &Frame) -> Result<(), TrackError> {
        save_frame(self.existing_path(index)?, frame)
    }

    fn existing_path(&self, index: usize) -> Result<&Path, TrackError> {
        self.path(index).ok_or_else(|| {
            TrackError::InvalidConfig(format!(
                "frame {index} is out of range for a sequence of {} frames",
                self.files.len()
            ))
        })
    }
}

pub fn load_frame(path: &Path) -> Result<Frame, TrackError> {
    let image = image::open(path).map_err(|source| TrackError::Image {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(image.to_rgb8())
}

pub fn save_frame(path: &Path, frame: &Frame) -> Result<(), TrackError> {
    let to_error = |source| TrackError::Image {
        path: path.to_path_buf(),
        source,
    };
    let format = ImageFormat::from_path(path).map_err(to_error)?;
    frame.save_with_format(path, format).map_err(to_error)
}

fn is_frame_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| FRAME_EXTENSIONS.iter().any(|known| ext.eq_ignore_ascii_case(known)))
        .unwrap_or(false)
}

/// Splits a file stem into (text before the last digit run, that number).
fn frame_key(path: &Path) -> (String, Option<u64>) {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let end = stem
        .rfind(|c: char| c.is_ascii_digit())
        .map(|i| i + 1)
        .unwrap_or(0);
    let start = stem[..end]
        .rfind(|c: char| !c.is_ascii_digit())
        .map(|i| i + 1)
        .unwrap_or(0);
    let number = stem[start..end].parse().ok();
    (stem[..start].to_string(), number)
}

fn frame_order(a: &Path, b: &Path) -> Ordering {
    let (prefix_a, number_a) = frame_key(a);
    let (prefix_b, number_b) = frame_key(b);
    prefix_a
        .cmp(&prefix_b)
        .then(number_a.cmp(&number_b))
        .then_with(|| a.file_name().cmp(&b.file_name()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::color::Color;
    use crate::core_modules::frame::{color_at, filled};

    fn touch_frame(dir: &Path, name: &str) {
        filled(2, 2, Color::new(9, 9, 9)).save(dir.join(name)).unwrap();
    }

    fn names(frames: &FrameDirectory) -> Vec<String> {
        frames
            .paths()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn orders_numbers_numerically() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["frame_10.png", "frame_9.png", "frame_1.png", "frame_100.png"] {
            touch_frame(dir.path(), name);
        }
        let frames = FrameDirectory::open(dir.path()).unwrap();
        assert_eq!(names(&frames), ["frame_1.png", "frame_9.png", "frame_10.png", "frame_100.png"]);
    }

    #[test]
    fn zero_padded_names_keep_their_order() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["frame_0003.png", "frame_0001.png", "frame_0002.png"] {
            touch_frame(dir.path(), name);
        }
        let frames = FrameDirectory::open(dir.path()).unwrap();
        assert_eq!(names(&frames), ["frame_0001.png", "frame_0002.png", "frame_0003.png"]);
    }

    #[test]
    fn skips_non_image_files() {
        let dir = tempfile::tempdir().unwrap();
        touch_frame(dir.path(), "frame_1.png");
        fs::write(dir.path().join("notes.txt"), "not a frame").unwrap();
        fs::create_dir(dir.path().join("nested.png")).unwrap();
        let frames = FrameDirectory::open(dir.path()).unwrap();
        assert_eq!(frames.len(), 1);
    }

    #[test]
    fn save_overwrites_in_place() {
        let dir = tempfile::tempdir().unwrap();
        touch_frame(dir.path(), "frame_1.png");
        let frames = FrameDirectory::open(dir.path()).unwrap();

        let mut frame = frames.load(0).unwrap();
        frame.put_pixel(1, 1, Color::new(200, 0, 0).into());
        frames.save(0, &frame).unwrap();

        let reloaded = frames.load(0).unwrap();
        assert_eq!(color_at(&reloaded, 1, 1), Some(Color::new(200, 0, 0)));
        assert_eq!(color_at(&reloaded, 0, 0), Some(Color::new(9, 9, 9)));
    }

    #[test]
    fn out_of_range_index_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let frames = FrameDirectory::open(dir.path()).unwrap();
        assert!(frames.is_empty());
        assert!(matches!(frames.load(0), Err(TrackError::InvalidConfig(_))));
    }

    #[test]
    fn unreadable_frame_reports_its_path() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("frame_1.png"), b"garbage").unwrap();
        let frames = FrameDirectory::open(dir.path()).unwrap();
        match frames.load(0) {
            Err(TrackError::Image { path, .. }) => assert!(path.ends_with("frame_1.png")),
            other => panic!("expected image error, got {other:?}"),
        }
    }
}
