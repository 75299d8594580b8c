use std::path::PathBuf;

use clap::Args;

use super::{BIN_NAME, output_dir, write_output};

#[derive(Args, Debug)]
pub struct ManArgs {
    /// Output directory (default: dist/share/man/man1)
    #[arg(long = "out-dir", default_value = "dist/share/man/man1")]
    pub out_dir: PathBuf,
}

/// One page for `branchver` and one per subcommand, named `branchver-<sub>.1`.
pub fn cmd_man(args: ManArgs) -> Result<(), String> {
    let out_dir = output_dir(&args.out_dir)?;
    let cmd = branchver::command();

    let mut pages = vec![(BIN_NAME.to_string(), cmd.clone())];
    pages.extend(
        cmd.get_subcommands()
            .map(|sub| (format!("{BIN_NAME}-{}", sub.get_name()), sub.clone())),
    );

    for (page, command) in pages {
        let mut buffer: Vec<u8> = Vec::new();
        clap_mangen::Man::new(command)
            .render(&mut buffer)
            .map_err(|e| format!("render {page} manpage: {e}"))?;
        write_output(&out_dir.join(format!("{page}.1")), buffer)?;
    }

    Ok(())
}
