//! BAM file I/O utilities.
//!
//! Helpers for creating BAM readers and writers with consistent error
//! handling. BGZF compression and decompression can be parallelized
//! independently of record processing, which stays strictly sequential:
//! with `threads <= 1` the plain BGZF codec is used, with `threads > 1`
//! the noodles multithreaded codec workers take over.

use std::fs::File;
use std::io::{self, BufRead, Read, Write};
use std::num::NonZeroUsize;
use std::path::Path;

use anyhow::{Context, Result};
use noodles::bgzf::{
    MultithreadedReader, MultithreadedWriter, Reader as BgzfReader, Writer as BgzfWriter,
};
use noodles::sam::Header;

/// BGZF reader that is either single-threaded or multithreaded.
pub enum BgzfReaderEnum {
    /// Single-threaded BGZF reader (lower overhead for small files)
    SingleThreaded(BgzfReader<File>),
    /// Multithreaded BGZF reader
    MultiThreaded(MultithreadedReader<File>),
}

impl Read for BgzfReaderEnum {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            BgzfReaderEnum::SingleThreaded(r) => r.read(buf),
            BgzfReaderEnum::MultiThreaded(r) => r.read(buf),
        }
    }
}

impl BufRead for BgzfReaderEnum {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        match self {
            BgzfReaderEnum::SingleThreaded(r) => r.fill_buf(),
            BgzfReaderEnum::MultiThreaded(r) => r.fill_buf(),
        }
    }

    fn consume(&mut self, amt: usize) {
        match self {
            BgzfReaderEnum::SingleThreaded(r) => r.consume(amt),
            BgzfReaderEnum::MultiThreaded(r) => r.consume(amt),
        }
    }
}

/// A BAM reader over either BGZF reader flavor.
pub type BamReader = noodles::bam::io::Reader<BgzfReaderEnum>;

/// BGZF writer that is either single-threaded or multithreaded.
pub enum BgzfWriterEnum {
    /// Single-threaded BGZF writer
    SingleThreaded(BgzfWriter<File>),
    /// Multithreaded BGZF writer
    MultiThreaded(MultithreadedWriter<File>),
}

impl Write for BgzfWriterEnum {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            BgzfWriterEnum::SingleThreaded(w) => w.write(buf),
            BgzfWriterEnum::MultiThreaded(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            BgzfWriterEnum::SingleThreaded(w) => w.flush(),
            BgzfWriterEnum::MultiThreaded(w) => w.flush(),
        }
    }
}

impl BgzfWriterEnum {
    /// Flushes remaining blocks and writes the BGZF EOF marker.
    ///
    /// # Errors
    /// Returns an error if flushing or finalizing the writer fails.
    pub fn finish(self) -> io::Result<()> {
        match self {
            // The single-threaded writer emits its EOF block on drop.
            BgzfWriterEnum::SingleThreaded(mut w) => w.flush(),
            BgzfWriterEnum::MultiThreaded(mut w) => w.finish().map(|_| ()),
        }
    }
}

/// A BAM writer over either BGZF writer flavor.
pub type BamWriter = noodles::bam::io::Writer<BgzfWriterEnum>;

/// Creates a BAM reader and reads its header.
///
/// # Errors
/// Returns an error if the file cannot be opened or the header cannot be
/// read.
pub fn create_bam_reader<P: AsRef<Path>>(path: P, threads: usize) -> Result<(BamReader, Header)> {
    let path_ref = path.as_ref();
    let file = File::open(path_ref)
        .with_context(|| format!("Failed to open input BAM: {}", path_ref.display()))?;

    let bgzf_reader = match NonZeroUsize::new(threads) {
        Some(workers) if workers.get() > 1 => {
            BgzfReaderEnum::MultiThreaded(MultithreadedReader::with_worker_count(workers, file))
        }
        _ => BgzfReaderEnum::SingleThreaded(BgzfReader::new(file)),
    };

    let mut reader = noodles::bam::io::Reader::from(bgzf_reader);
    let header = reader
        .read_header()
        .with_context(|| format!("Failed to read header from: {}", path_ref.display()))?;

    Ok((reader, header))
}

/// Creates a BAM writer and writes the header.
///
/// # Errors
/// Returns an error if the file cannot be created or the header cannot be
/// written.
pub fn create_bam_writer<P: AsRef<Path>>(
    path: P,
    header: &Header,
    threads: usize,
) -> Result<BamWriter> {
    let path_ref = path.as_ref();
    let file = File::create(path_ref)
        .with_context(|| format!("Failed to create output BAM: {}", path_ref.display()))?;

    let bgzf_writer = match NonZeroUsize::new(threads) {
        Some(workers) if workers.get() > 1 => {
            BgzfWriterEnum::MultiThreaded(MultithreadedWriter::with_worker_count(workers, file))
        }
        _ => BgzfWriterEnum::SingleThreaded(BgzfWriter::new(file)),
    };

    let mut writer = noodles::bam::io::Writer::from(bgzf_writer);
    writer
        .write_header(header)
        .with_context(|| format!("Failed to write header to: {}", path_ref.display()))?;

    Ok(writer)
}

/// Creates a BAM writer only when a path is given.
///
/// Convenience for optional side-channel outputs.
///
/// # Errors
/// Returns an error if the file cannot be created or the header cannot be
/// written.
pub fn create_optional_bam_writer<P: AsRef<Path>>(
    path: Option<P>,
    header: &Header,
    threads: usize,
) -> Result<Option<BamWriter>> {
    path.map(|p| create_bam_writer(p, header, threads)).transpose()
}
