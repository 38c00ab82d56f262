use std::path::PathBuf;
use std::process::exit;

use clap::Parser;
use log::LevelFilter;
use pretty_env_logger::env_logger::Target;

use tinyvm::analysis::controlflow::ControlFlowAnalyzer;
use tinyvm::error::VmError;
use tinyvm::vm::VirtualMachine;

/// Load a bytecode program, verify it and run it.
#[derive(Parser, Debug)]
#[clap(name = "tinyvm")]
struct Args {
    /// File path containing the program you want to run
    codefile: PathBuf,

    /// Print the basic block partition instead of executing
    #[clap(long)]
    analyze: bool,

    /// Program arguments, converted by the declared parameter types
    args: Vec<String>,
}

fn main() {
    pretty_env_logger::formatted_builder()
        .target(Target::Stdout)
        .filter_level(LevelFilter::Info)
        .init();

    if let Err(error) = run(Args::parse()) {
        eprintln!("error: {}", error);
        exit(1);
    }
}

fn run(args: Args) -> Result<(), VmError> {
    let vm = VirtualMachine::load_file(&args.codefile)?;

    if args.analyze {
        let mut analyzer = ControlFlowAnalyzer::new();
        for block in analyzer.analyze(&vm.program) {
            println!("{:?}", block);
        }
        return Ok(());
    }

    let converted = vm.convert_args(&args.args)?;
    let result = vm.run(converted)?;
    println!("RETURN {}", result);
    Ok(())
}
