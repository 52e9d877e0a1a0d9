use super::*;
use byteorder::ByteOrder;
use byteorder::LittleEndian;
use chb_core::*;
use memmap2::Mmap;
use memmap2::MmapMut;
use rayon::prelude::*;
use std::borrow::Cow;
use std::fs::File;
use std::fs::OpenOptions;
use std::path::Path;
use std::path::PathBuf;

/// Shape record written next to the matrix file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
struct Shape {
    n: usize,
}

/// Distance matrix stored as flat row-major little-endian f64 in a file,
/// mapped read-only once written.
///
/// The shape lives in a JSON sidecar at `<path>.json`. Rows are written to
/// `<path>.partial` and renamed into place after a flush, and the sidecar
/// is written last, so an interrupted build never looks like a cache.
pub struct Mapped {
    n: usize,
    path: PathBuf,
    mmap: Mmap,
    reused: bool,
}

impl Mapped {
    /// Reuses a finished matrix at `path`, or computes one there.
    pub fn grow(samples: &Samples, path: &Path) -> Result<Self> {
        match Self::done(path) {
            true => {
                log::info!("{:<32}{:<32}", "reusing distance matrix", path.display());
                Self::load(path, samples.n()).map(|mapped| Self {
                    reused: true,
                    ..mapped
                })
            }
            false => Self::save(samples, path),
        }
    }

    /// Whether a finished matrix (file and sidecar) exists at `path`.
    pub fn done(path: &Path) -> bool {
        path.is_file() && Self::sidecar(path).is_file()
    }

    /// Maps a finished matrix, checking it against the expected sample count.
    pub fn load(path: &Path, n: usize) -> Result<Self> {
        let ref sidecar = Self::sidecar(path);
        let shape = serde_json::from_reader::<_, Shape>(std::io::BufReader::new(File::open(sidecar)?))
            .map_err(|e| Error::CorruptCache(format!("{}: {}", sidecar.display(), e)))?;
        if shape.n != n {
            return Err(Error::CacheMismatch {
                expected: n,
                found: shape.n,
            });
        }
        if n == 0 {
            return Err(Error::InvalidConfig("distance matrix needs at least one sample"));
        }
        let file = File::open(path)?;
        let len = file.metadata()?.len();
        if len as u128 != footprint(n) {
            return Err(Error::CorruptCache(format!(
                "{} holds {} bytes, expected {}",
                path.display(),
                len,
                footprint(n)
            )));
        }
        // the file is only ever replaced by rename, never written in place
        let mmap = unsafe { Mmap::map(&file)? };
        Ok(Self {
            n,
            path: path.to_path_buf(),
            mmap,
            reused: false,
        })
    }

    /// Computes the matrix into `path` and maps it read-only.
    pub fn save(samples: &Samples, path: &Path) -> Result<Self> {
        let n = samples.n();
        if n == 0 {
            return Err(Error::InvalidConfig("distance matrix needs at least one sample"));
        }
        let bytes = footprint(n);
        let len = u64::try_from(bytes).map_err(|_| Error::Allocation { n, bytes })?;
        let width = n
            .checked_mul(size_of::<f64>())
            .ok_or(Error::Allocation { n, bytes })?;
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        let ref partial = Self::partial(path);
        log::info!("{:<32}{:<32}", "writing distance matrix", partial.display());
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(partial)?;
        file.set_len(len)?;
        let mut mmap = unsafe { MmapMut::map_mut(&file) }.map_err(|_| Error::Allocation { n, bytes })?;
        mmap.par_chunks_mut(width).enumerate().for_each(|(i, chunk)| {
            let mut row = vec![0.; n];
            samples.fill(i, &mut row);
            LittleEndian::write_f64_into(&row, chunk);
        });
        mmap.flush()?;
        drop(mmap);
        drop(file);
        std::fs::rename(partial, path)?;
        let sidecar = File::create(Self::sidecar(path))?;
        serde_json::to_writer(sidecar, &Shape { n }).map_err(std::io::Error::from)?;
        Self::load(path, n)
    }

    /// Deletes the matrix file and its sidecar.
    pub fn remove(self) -> Result<()> {
        let Self { path, mmap, .. } = self;
        drop(mmap);
        std::fs::remove_file(Self::sidecar(&path))?;
        std::fs::remove_file(&path)?;
        log::debug!("{:<32}{:<32}", "removed distance matrix", path.display());
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether `grow` found this matrix already on disk.
    pub fn reused(&self) -> bool {
        self.reused
    }

    pub fn sidecar(path: &Path) -> PathBuf {
        Self::suffixed(path, ".json")
    }

    pub fn partial(path: &Path) -> PathBuf {
        Self::suffixed(path, ".partial")
    }

    fn suffixed(path: &Path, suffix: &str) -> PathBuf {
        let mut name = path.as_os_str().to_owned();
        name.push(suffix);
        PathBuf::from(name)
    }

    fn offset(&self, i: Sample, j: Sample) -> usize {
        (i * self.n + j) * size_of::<f64>()
    }
}

impl Rows for Mapped {
    fn n(&self) -> usize {
        self.n
    }
    fn row(&self, i: Sample) -> Cow<'_, [Distance]> {
        let mut row = vec![0.; self.n];
        let start = self.offset(i, 0);
        let end = self.offset(i + 1, 0);
        LittleEndian::read_f64_into(&self.mmap[start..end], &mut row);
        Cow::Owned(row)
    }
    fn get(&self, i: Sample, j: Sample) -> Distance {
        let start = self.offset(i, j);
        LittleEndian::read_f64(&self.mmap[start..start + size_of::<f64>()])
    }
}
