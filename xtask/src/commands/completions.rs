use std::path::PathBuf;

use clap::{Args, ValueEnum};
use clap_complete::{Shell, generate_to};

use super::{BIN_NAME, output_dir};

#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Output directory (default: dist/share/completions)
    #[arg(long = "out-dir", default_value = "dist/share/completions")]
    pub out_dir: PathBuf,

    /// Generate only for specific shell (default: every supported shell)
    #[arg(long, value_enum)]
    pub shell: Option<Shell>,
}

pub fn cmd_completions(args: CompletionsArgs) -> Result<(), String> {
    let out_dir = output_dir(&args.out_dir)?;
    let mut cmd = branchver::command();

    let shells = args
        .shell
        .map_or_else(|| Shell::value_variants().to_vec(), |shell| vec![shell]);
    for shell in shells {
        let path = generate_to(shell, &mut cmd, BIN_NAME, &out_dir)
            .map_err(|e| format!("generate {shell} completions: {e}"))?;
        println!("wrote {}", path.display());
    }

    Ok(())
}
