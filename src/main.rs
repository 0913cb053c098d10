use clap::Parser;
use lc3_vm::cli::Cli;
use lc3_vm::host::{self, TermiosKeyboard};
use lc3_vm::Vm;

use std::fs::File;
use std::process;
use std::sync::Mutex;

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let mut vm = Vm::new();

    if let Err(err) = run(&mut vm, &cli) {
        log::error!("{}", err);
        eprintln!("lc3-vm: {}", err);
        process::exit(1);
    }
}

fn run(vm: &mut Vm, cli: &Cli) -> Result<(), lc3_vm::VmError> {
    let image_file = File::open(&cli.program)?;
    vm.load_program(image_file)?;
    log::info!("loaded image {}", cli.program.display());

    let original_termios = host::disable_input_buffering().map_err(lc3_vm::VmError::HostIo)?;
    let restore = Mutex::new(Some(original_termios.clone()));

    // SIGINT must still leave the terminal in cooked mode; restoring it from inside the
    // handler is the only reliable way to do that since the fetch-decode-execute loop never
    // otherwise yields control back to `main`.
    ctrlc::set_handler(move || {
        if let Some(termios) = restore.lock().unwrap().take() {
            let _ = host::restore_input_buffering(&termios);
        }
        process::exit(254);
    })
    .expect("failed to install SIGINT handler");

    let mut keyboard = TermiosKeyboard;
    let result = vm.run(&mut keyboard);
    if result.is_ok() {
        log::info!("halted");
    }

    host::restore_input_buffering(&original_termios).map_err(lc3_vm::VmError::HostIo)?;

    result
}
