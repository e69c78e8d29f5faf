mod block_file;
mod cli;

use std::fs::File;
use std::io::{self, Write};
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use derive_more::{Display, From};
use storage::{Storage, Whence};
use typed_bytesize::ByteSizeIec;

pub use self::{
    block_file::BlockFile,
    cli::{Cli, Command},
};

#[derive(Debug, Display, From)]
enum Failure {
    #[display(fmt = "{}", _0)]
    Io(io::Error),
    #[display(fmt = "{}", _0)]
    Storage(storage::Error),
}

fn main() -> ExitCode {
    env_logger::init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("disk-cat: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Failure> {
    let fd = File::open(&cli.image)?;
    let mut storage = Storage::mount(Arc::new(BlockFile::new(fd, cli.paired)))?;

    match cli.command {
        Command::Parts => {
            for vol in storage.volumes() {
                println!("{}\t{}\t{}\t{}", vol.index, vol.tag, vol.start, vol.kind);
            }
        }
        Command::Cat { path } => {
            let fd = storage.open(&path)?;
            let mut stdout = io::stdout().lock();
            let mut buf = vec![0u8; 64 * 1024];
            loop {
                let len = storage.read(fd, &mut buf)?;
                if len == 0 {
                    break;
                }
                stdout.write_all(&buf[..len])?;
            }
            storage.close(fd);
        }
        Command::Stat { path } => {
            let fd = storage.open(&path)?;
            let size = storage.seek(fd, 0, Whence::End)?;
            print!("{path}: {} ({size} bytes)", ByteSizeIec(size as u64));
            match storage.get_info(fd)? {
                Some(checksum) => println!(", checksum {checksum:#010x}"),
                None => println!(),
            }
            storage.close(fd);
        }
    }

    log::info!("{:?}", storage.cache().stats());
    Ok(())
}
