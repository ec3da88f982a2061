use unwoff2::decode_woff2;

fn main() {
    let mut args = std::env::args();
    let program = args.next().unwrap_or_else(|| "unwoff2".into());
    let (Some(infile), Some(outfile)) = (args.next(), args.next()) else {
        eprintln!("Usage: {program} <input.woff2> <output.ttf>");
        std::process::exit(2);
    };

    let woff = match std::fs::read(&infile) {
        Ok(woff) => woff,
        Err(err) => {
            eprintln!("{program}: cannot read {infile}: {err}");
            std::process::exit(1);
        }
    };

    let sfnt = match decode_woff2(&woff) {
        Ok(sfnt) => sfnt,
        Err(err) => {
            eprintln!("{program}: {infile}: {err}");
            std::process::exit(1);
        }
    };

    if let Err(err) = std::fs::write(&outfile, sfnt) {
        eprintln!("{program}: cannot write {outfile}: {err}");
        std::process::exit(1);
    }
}
