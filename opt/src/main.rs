use std::fs::File;
use std::io::BufReader;

use color_eyre::eyre::{eyre, Result, WrapErr};
use log::{info, LevelFilter};
use lutmap::logic::LogicNetwork;
use lutmap::params::LutMapParams;
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

fn main() -> Result<()> {
    color_eyre::install()?;
    TermLogger::init(LevelFilter::Info, Config::default(), TerminalMode::Mixed, ColorChoice::Auto)?;

    let mut args = std::env::args().skip(1);
    let input = args.next().ok_or_else(|| eyre!("usage: opt <input.aag> [params.json] [output.dot]"))?;

    let ps: LutMapParams = match args.next() {
        Some(path) => {
            let f = File::open(&path).wrap_err_with(|| format!("opening {}", path))?;
            serde_json::from_reader(BufReader::new(f)).wrap_err_with(|| format!("parsing {}", path))?
        },
        None => LutMapParams::default(),
    };

    let f = File::open(&input).wrap_err_with(|| format!("opening {}", input))?;
    let ntk = LogicNetwork::from_aiger(BufReader::new(f))?;
    info!(
        "read {}: {} inputs, {} outputs, {} gates",
        input,
        ntk.num_pis(),
        ntk.num_pos(),
        ntk.num_gates()
    );

    let (luts, st) = lutmap::lut_map(&ntk, &ps)?;
    st.report();
    info!("{} LUTs, depth {}", luts.num_luts(), luts.depth());

    if let Some(path) = args.next() {
        let f = File::create(&path).wrap_err_with(|| format!("creating {}", path))?;
        luts.to_graphviz(f)?;
    }

    Ok(())
}
