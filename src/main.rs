use std::path::PathBuf;

#[derive(Debug, Default)]
struct CliArgs {
    folder: Option<PathBuf>,
    no_audio: bool,
}

fn main() -> anyhow::Result<()> {
    let args = parse_args(std::env::args().skip(1).collect())?;

    supersonic::app::run(supersonic::app::AppOptions {
        folder: args.folder,
        no_audio: args.no_audio,
    })
}

fn parse_args(args: Vec<String>) -> anyhow::Result<CliArgs> {
    let mut out = CliArgs::default();
    for arg in args {
        match arg.as_str() {
            "--no-audio" => out.no_audio = true,
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            other if other.starts_with('-') => anyhow::bail!("unknown argument {other}"),
            other => {
                if out.folder.is_some() {
                    anyhow::bail!("only one folder argument is accepted");
                }
                out.folder = Some(PathBuf::from(other));
            }
        }
    }
    Ok(out)
}

fn print_help() {
    println!("Supersonic");
    println!("  [folder]      Music folder to load at startup");
    println!("  --no-audio    Run without an output device (logical playback clock)");
}
