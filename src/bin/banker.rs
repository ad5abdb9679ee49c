//! Terminal Monopoly banker.
//!
//! Headless session server. Logs go to `TM_LOG_PATH`, or stderr when it is
//! unset. Commands are read from stdin:
//!
//! ```text
//! say ID TEXT        message one player
//! all TEXT           message every player
//! notify ID TEXT     out-of-band notice to one player
//! kill ID N          kill terminal N of player ID (also: disable, enable, busy)
//! kick ID            disconnect a player
//! status             print every player's terminal statuses
//! quit
//! ```

use std::io::BufRead;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tracing::{info, warn};

use terminal_monopoly::logging;
use terminal_monopoly::net::{
    check_tcp_listen_available, Banker, BankerConfig, BankerEvent, Outbound,
};
use terminal_monopoly::types::{StatusChange, TerminalCommand, TERMINAL_COUNT};

const EVENT_WAIT: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, PartialEq, Eq)]
enum BankerCommand {
    Send(Outbound),
    Status,
    Quit,
}

fn parse_player(word: Option<&str>) -> Result<u32> {
    let word = word.context("missing player id")?;
    word.parse()
        .with_context(|| format!("bad player id {word:?}"))
}

fn parse_command(line: &str) -> Result<Option<BankerCommand>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let mut words = line.splitn(3, ' ');
    let verb = words.next().unwrap_or_default();

    let cmd = match verb {
        "quit" | "exit" => BankerCommand::Quit,
        "status" => BankerCommand::Status,
        "all" => {
            let text = line[verb.len()..].trim();
            if text.is_empty() {
                bail!("all needs a message");
            }
            BankerCommand::Send(Outbound::Broadcast {
                text: text.to_string(),
            })
        }
        "say" | "notify" => {
            let player_id = parse_player(words.next())?;
            let text = words.next().unwrap_or_default().trim().to_string();
            if text.is_empty() {
                bail!("{verb} needs a message");
            }
            BankerCommand::Send(if verb == "say" {
                Outbound::ToPlayer { player_id, text }
            } else {
                Outbound::Notify { player_id, text }
            })
        }
        "kick" => BankerCommand::Send(Outbound::Disconnect {
            player_id: parse_player(words.next())?,
        }),
        "kill" | "disable" | "enable" | "busy" => {
            let change = match verb {
                "kill" => StatusChange::Killed,
                "disable" => StatusChange::Disabled,
                "enable" => StatusChange::Active,
                _ => StatusChange::Busy,
            };
            let player_id = parse_player(words.next())?;
            let terminal = words.next().unwrap_or_default().trim();
            let cmd: TerminalCommand = format!("{} {terminal}", change.word())
                .parse()
                .with_context(|| format!("bad terminal {terminal:?}"))?;
            BankerCommand::Send(Outbound::ToPlayer {
                player_id,
                text: cmd.to_string(),
            })
        }
        other => bail!("unknown command {other:?}"),
    };
    Ok(Some(cmd))
}

fn main() -> Result<()> {
    let config = BankerConfig::from_env();
    match &config.log_path {
        Some(path) => logging::init_file(path)?,
        None => logging::init_stderr()?,
    }

    check_tcp_listen_available(&config.host, config.port)
        .with_context(|| format!("port {} is not available", config.port))?;
    let oof_port = config
        .port
        .checked_add(1)
        .context("no notification port above 65535")?;
    check_tcp_listen_available(&config.host, oof_port)
        .with_context(|| format!("notification port {oof_port} is not available"))?;

    let mut banker = Banker::start(config)?;
    info!(addr = %banker.local_addr(), "banker ready");

    let (line_tx, line_rx) = mpsc::channel::<String>();
    thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if line_tx.send(line).is_err() {
                break;
            }
        }
    });

    loop {
        if let Some(event) = banker.recv_timeout(EVENT_WAIT) {
            log_event(&event);
        }

        while let Ok(line) = line_rx.try_recv() {
            match parse_command(&line) {
                Ok(None) => {}
                Ok(Some(BankerCommand::Quit)) => return Ok(()),
                Ok(Some(BankerCommand::Status)) => print_statuses(&banker),
                Ok(Some(BankerCommand::Send(msg))) => banker.send(msg)?,
                Err(e) => warn!("{e:#}"),
            }
        }
    }
}

fn log_event(event: &BankerEvent) {
    match event {
        BankerEvent::Joined { player_id, addr } => info!(player_id, %addr, "player joined"),
        BankerEvent::Message { player_id, text } => info!(player_id, %text, "message"),
        BankerEvent::Status { player_id, update } => info!(player_id, %update, "status"),
        BankerEvent::OutOfFocus { player_id, text } => {
            info!(player_id, %text, "out-of-focus message")
        }
        BankerEvent::Left { player_id, reason } => info!(player_id, %reason, "player left"),
    }
}

fn print_statuses(banker: &Banker) {
    let board = banker.statuses();
    for player_id in board.players() {
        let row: Vec<String> = (1..=TERMINAL_COUNT as u8)
            .map(|t| {
                let status = board
                    .status(player_id, t)
                    .map(|s| s.as_str())
                    .unwrap_or("?");
                let dead = if board.is_killed(player_id, t) { "+" } else { "" };
                format!("{t}:{status}{dead}")
            })
            .collect();
        println!("player {player_id}: {}", row.join(" "));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_messages() {
        assert_eq!(
            parse_command("say 2 your turn").unwrap(),
            Some(BankerCommand::Send(Outbound::ToPlayer {
                player_id: 2,
                text: "your turn".to_string()
            }))
        );
        assert_eq!(
            parse_command("all game starts").unwrap(),
            Some(BankerCommand::Send(Outbound::Broadcast {
                text: "game starts".to_string()
            }))
        );
        assert_eq!(
            parse_command("notify 1 rent due").unwrap(),
            Some(BankerCommand::Send(Outbound::Notify {
                player_id: 1,
                text: "rent due".to_string()
            }))
        );
    }

    #[test]
    fn terminal_commands_use_wire_words() {
        assert_eq!(
            parse_command("enable 3 2").unwrap(),
            Some(BankerCommand::Send(Outbound::ToPlayer {
                player_id: 3,
                text: "active 2".to_string()
            }))
        );
        assert_eq!(
            parse_command("kill 1 4").unwrap(),
            Some(BankerCommand::Send(Outbound::ToPlayer {
                player_id: 1,
                text: "kill 4".to_string()
            }))
        );
        assert!(parse_command("kill 1 9").is_err());
        assert!(parse_command("kill x 1").is_err());
    }

    #[test]
    fn other_commands() {
        assert_eq!(parse_command("").unwrap(), None);
        assert_eq!(parse_command("status").unwrap(), Some(BankerCommand::Status));
        assert_eq!(
            parse_command("kick 4").unwrap(),
            Some(BankerCommand::Send(Outbound::Disconnect { player_id: 4 }))
        );
        assert!(parse_command("say 1").is_err());
        assert!(parse_command("dance").is_err());
    }
}
