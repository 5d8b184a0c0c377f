#![deny(unused_must_use)]

//! `fsctl` — a small command dispatcher over the mounted `ecs150fs`
//! library API, for driving a disk image from the shell.

use anyhow::{anyhow, bail, Context};
use ecs150fs::{FileBlockDevice, FileSystem, BLOCK_SIZE};
use std::env;

fn main() -> Result<(), anyhow::Error> {
    env_logger::init();

    let args = env::args().skip(1).collect::<Vec<_>>();
    let args = args.iter().map(|s| &**s).collect::<Vec<_>>();

    match &args[..] {
        [diskname, "info"] => info(diskname),
        [diskname, "ls"] => ls(diskname),
        [diskname, "create", filename] => create(diskname, filename),
        [diskname, "delete", filename] => delete(diskname, filename),
        [diskname, "cat", filename] => cat(diskname, filename),
        [diskname, "stat", filename] => stat(diskname, filename),
        [diskname, "write", filename, data] => write(diskname, filename, data, 0),
        [diskname, "write", filename, data, offset] => {
            let offset: u32 = offset.parse().context("offset must be a u32")?;
            write(diskname, filename, data, offset)
        }
        _ => {
            println!("USAGE: fsctl <diskname> info");
            println!("OR:    fsctl <diskname> ls");
            println!("OR:    fsctl <diskname> create <filename>");
            println!("OR:    fsctl <diskname> delete <filename>");
            println!("OR:    fsctl <diskname> cat <filename>");
            println!("OR:    fsctl <diskname> stat <filename>");
            println!("OR:    fsctl <diskname> write <filename> <data> [offset]");
            Ok(())
        }
    }
}

fn mount(diskname: &str) -> Result<FileSystem<FileBlockDevice>, anyhow::Error> {
    let device = FileBlockDevice::open(diskname)
        .with_context(|| format!("failed to open {}", diskname))?;
    FileSystem::mount(device).map_err(|e| anyhow!("failed to mount {}: {}", diskname, e))
}

fn info(diskname: &str) -> Result<(), anyhow::Error> {
    let fs = mount(diskname)?;
    fs.info();
    fs.umount().map_err(|e| anyhow!("umount failed: {}", e))?;
    Ok(())
}

fn ls(diskname: &str) -> Result<(), anyhow::Error> {
    let fs = mount(diskname)?;
    fs.ls();
    fs.umount().map_err(|e| anyhow!("umount failed: {}", e))?;
    Ok(())
}

fn create(diskname: &str, filename: &str) -> Result<(), anyhow::Error> {
    let mut fs = mount(diskname)?;
    fs.create(filename)
        .map_err(|e| anyhow!("create failed: {}", e))?;
    fs.umount().map_err(|e| anyhow!("umount failed: {}", e))?;
    Ok(())
}

fn delete(diskname: &str, filename: &str) -> Result<(), anyhow::Error> {
    let mut fs = mount(diskname)?;
    fs.delete(filename)
        .map_err(|e| anyhow!("delete failed: {}", e))?;
    fs.umount().map_err(|e| anyhow!("umount failed: {}", e))?;
    Ok(())
}

fn stat(diskname: &str, filename: &str) -> Result<(), anyhow::Error> {
    let mut fs = mount(diskname)?;
    let fd = fs
        .open(filename)
        .map_err(|e| anyhow!("open failed: {}", e))?;
    let size = fs.stat(fd).map_err(|e| anyhow!("stat failed: {}", e))?;
    println!("{}: size {}", filename, size);
    fs.close(fd).map_err(|e| anyhow!("close failed: {}", e))?;
    fs.umount().map_err(|e| anyhow!("umount failed: {}", e))?;
    Ok(())
}

fn cat(diskname: &str, filename: &str) -> Result<(), anyhow::Error> {
    let mut fs = mount(diskname)?;
    let fd = fs
        .open(filename)
        .map_err(|e| anyhow!("open failed: {}", e))?;

    let mut contents = Vec::new();
    let mut chunk = vec![0u8; BLOCK_SIZE];
    loop {
        let read = fs
            .read(fd, &mut chunk)
            .map_err(|e| anyhow!("read failed: {}", e))?;
        if read == 0 {
            break;
        }
        contents.extend_from_slice(&chunk[..read]);
    }

    fs.close(fd).map_err(|e| anyhow!("close failed: {}", e))?;
    fs.umount().map_err(|e| anyhow!("umount failed: {}", e))?;
    print!("{}", String::from_utf8_lossy(&contents));
    Ok(())
}

fn write(diskname: &str, filename: &str, data: &str, offset: u32) -> Result<(), anyhow::Error> {
    if !data.is_ascii() {
        bail!("write only accepts ASCII payloads from the command line");
    }
    let mut fs = mount(diskname)?;
    let fd = fs
        .open(filename)
        .map_err(|e| anyhow!("open failed: {}", e))?;
    fs.lseek(fd, offset)
        .map_err(|e| anyhow!("lseek failed: {}", e))?;
    let written = fs
        .write(fd, data.as_bytes())
        .map_err(|e| anyhow!("write failed: {}", e))?;
    println!("wrote {} of {} bytes", written, data.len());
    fs.close(fd).map_err(|e| anyhow!("close failed: {}", e))?;
    fs.umount().map_err(|e| anyhow!("umount failed: {}", e))?;
    Ok(())
}
