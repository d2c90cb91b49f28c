//! CLI entry point for `mkssfs`: creates and/or formats an SSFS disk image.

use std::path::PathBuf;

use clap::Parser;
use ssfs::{BlockDevice, DiskFile, FileSystem, BLOCK_SIZE};

/// Create and format an SSFS disk image
#[derive(Parser)]
struct Cli {
    /// Path to the .img file
    image: PathBuf,

    /// Size of the image in 1024-byte blocks; when given, the image file
    /// is created (or truncated) first
    #[arg(short, long)]
    blocks: Option<usize>,

    /// Number of inodes the volume should hold
    #[arg(short, long, default_value_t = 32)]
    inodes: u32,
}

fn main() -> ssfs::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let disk = match cli.blocks {
        Some(blocks) => DiskFile::create(&cli.image, blocks)?,
        None => DiskFile::open(&cli.image)?,
    };
    FileSystem::format(&disk, cli.inodes)?;

    println!(
        "SSFS image created at {} ({} blocks of {} bytes, {} inodes requested)",
        cli.image.display(),
        disk.num_blocks(),
        BLOCK_SIZE,
        cli.inodes.max(1),
    );
    Ok(())
}
