//! `watch` and `once`: drive a poller and print what it observes.

use std::io;

use chrono::Local;
use tracing::{debug, info};

use livecount_api::AnalyticsClient;
use livecount_core::{ObservedState, Poller, StateStream};

use crate::cli::{GlobalOpts, WatchArgs};
use crate::config::{self, Target};
use crate::error::CliError;
use crate::output;

/// Start a poller for the resolved target and subscribe to it.
///
/// The subscription is taken before enabling so the first loading
/// snapshot is not missed.
async fn start(target: &Target) -> Result<(Poller<AnalyticsClient>, StateStream), CliError> {
    let client = AnalyticsClient::new(&target.transport)?;
    let poller = Poller::new(client, target.options.clone());
    let stream = poller.subscribe();

    info!(
        profile = %target.profile_name,
        interval = ?target.options.refresh_interval,
        "starting poller"
    );
    poller.update(target.poll.clone()).await;

    Ok((poller, stream))
}

fn emit(global: &GlobalOpts, state: &ObservedState, resource: Option<&str>) -> Result<(), CliError> {
    let color = output::should_color(global.color);
    let line = output::render_state(global.output, state, resource, Local::now(), color)?;
    output::print_line(&line, global.quiet)?;
    Ok(())
}

/// Poll until interrupted, printing every state change.
pub async fn watch(args: WatchArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let target = config::resolve_target(global, args.resource)?;
    let resource = target.poll.resource_filter.clone();
    let (poller, mut stream) = start(&target).await?;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let result = loop {
        tokio::select! {
            signal = &mut ctrl_c => {
                debug!("interrupted");
                break signal.map_err(CliError::from);
            }
            next = stream.changed() => {
                let Some(state) = next else {
                    break Ok(());
                };
                match emit(global, &state, resource.as_deref()) {
                    Ok(()) => {}
                    // Reader went away (e.g. `| head`): stop quietly.
                    Err(CliError::Io(e)) if e.kind() == io::ErrorKind::BrokenPipe => {
                        debug!("stdout closed");
                        break Ok(());
                    }
                    Err(e) => break Err(e),
                }
            }
        }
    };

    poller.shutdown().await;
    result
}

/// Poll until the first settled count, print it, and exit.
///
/// A failure with nothing retained to show is reported as an error.
pub async fn once(args: WatchArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let target = config::resolve_target(global, args.resource)?;
    let resource = target.poll.resource_filter.clone();
    let (poller, mut stream) = start(&target).await?;

    let settled = loop {
        match stream.changed().await {
            Some(state) if state.is_settled() => break Some(state),
            Some(_) => {}
            None => break None,
        }
    };
    poller.shutdown().await;

    let Some(state) = settled else {
        return Err(CliError::Config {
            message: "poller stopped before a count was observed".into(),
        });
    };

    if let Some(ref err) = state.error {
        return Err(CliError::from(&**err));
    }

    emit(global, &state, resource.as_deref())
}
