use clap::Parser;
use color_print::cformat;
use ricart_agrawala::{config::Args, log, poisson::Poisson, Peer, TcpLink};
use std::{error::Error, time::Duration};
use tokio::time::sleep;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let args = Args::parse();

    let config = match args.to_config() {
        Ok(config) => config,
        Err(e) => {
            log::init(args.debug);
            log::error(&format!("{e}"));
            return Err(e.into());
        }
    };
    log::init(config.debug);

    let (link, inbound) = match TcpLink::bind(config.own_address(), config.dial_retry).await {
        Ok(bound) => bound,
        Err(e) => {
            log::error(&cformat!(
                "Couldn't listen on <bold>{}</bold>: {e}",
                config.own_address()
            ));
            return Err(e);
        }
    };

    let index = config.index;
    log::info(&cformat!(
        "Process <bold>{index}</bold> listening on <bold>{}</bold>.",
        link.address()
    ));

    let mut peer = Peer::spawn(config, link, inbound)?;
    let mut poisson = Poisson::new(args.rate, args.seed.unwrap_or(index as u64));
    let hold = Duration::from_millis(args.hold_ms);

    let mut round = 0u64;
    while args.rounds == 0 || round < args.rounds {
        tokio::select! {
            _ = sleep(poisson.delay_for_next_event()) => {}
            _ = tokio::signal::ctrl_c() => return Ok(()),
        }

        peer.enter().await?;
        round += 1;
        log::info(&cformat!(
            "Process <bold>{index}</bold> is in the <yellow, bold>critical section</yellow, bold> (round <bold>{round}</bold>)."
        ));
        sleep(hold).await;
        peer.exit().await?;
    }

    log::info(&cformat!(
        "Finished <bold>{round}</bold> round(s). Still answering peers, press <bold>Ctrl-C</bold> to stop."
    ));
    tokio::signal::ctrl_c().await?;

    Ok(())
}
