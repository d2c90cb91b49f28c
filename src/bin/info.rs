//! CLI entry point for `ssfs-info`: inspects an SSFS disk image.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use ssfs::{DiskFile, FileSystem};

/// Simple inspection tool for SSFS images
#[derive(Parser)]
struct Cli {
    /// Path to the .img file
    image: PathBuf,
}

fn main() -> ssfs::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let disk = DiskFile::open(&cli.image)?;
    let fs = FileSystem::mount(Arc::new(disk))?;
    let sb = fs.superblock();

    println!("====== SSFS SUPERBLOCK ======");
    println!("Magic:           {:02x?}", sb.magic);
    println!("Block size:      {} bytes", sb.block_size);
    println!("Total blocks:    {}", sb.num_blocks);
    println!("Inode blocks:    {}", sb.num_inode_blocks);
    println!("Inodes:          {}", sb.num_inodes());
    println!("Data region:     blocks {}..{}", sb.data_start(), sb.num_blocks);
    println!("Free blocks:     {}", fs.free_data_blocks());

    println!("\n====== VALID INODES ======");
    let mut found = 0;
    for inode_id in 0..sb.num_inodes() {
        if let Ok(size) = fs.stat(inode_id) {
            println!("inode {:>5}  {:>10} bytes", inode_id, size);
            found += 1;
        }
    }
    if found == 0 {
        println!("(none)");
    }
    Ok(())
}
