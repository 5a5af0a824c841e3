//! Convenience wrappers for common server console commands. All of them are
//! thin string formatting over [`RconClient::execute`].

use log::warn;

use crate::client::RconClient;
use crate::Result;

/// Online-player summary parsed from the `list` command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayerList {
    pub online: u32,
    pub max_players: u32,
    pub names: Vec<String>,
}

impl RconClient {
    /// Run `list` and parse the response.
    pub async fn list_players(&self) -> Result<PlayerList> {
        let response = self.execute("list").await?;
        Ok(parse_player_list(&response))
    }

    /// Broadcast a message to all players.
    pub async fn say(&self, message: &str) -> Result<String> {
        self.execute(&format!("say {}", escape_quotes(message))).await
    }

    /// Send a private message to one player.
    pub async fn tell(&self, player: &str, message: &str) -> Result<String> {
        self.execute(&format!("tell {player} {}", escape_quotes(message)))
            .await
    }

    pub async fn kick(&self, player: &str, reason: Option<&str>) -> Result<String> {
        let reason = reason.unwrap_or("Kicked by administrator");
        self.execute(&format!("kick {player} {}", escape_quotes(reason)))
            .await
    }

    pub async fn ban(&self, player: &str, reason: Option<&str>) -> Result<String> {
        let reason = reason.unwrap_or("Banned by administrator");
        self.execute(&format!("ban {player} {}", escape_quotes(reason)))
            .await
    }

    /// Ban an IP address, or the IP of a named online player.
    pub async fn ban_ip(&self, ip_or_player: &str, reason: Option<&str>) -> Result<String> {
        let reason = reason.unwrap_or("Banned by administrator");
        self.execute(&format!("ban-ip {ip_or_player} {}", escape_quotes(reason)))
            .await
    }

    pub async fn pardon(&self, player: &str) -> Result<String> {
        self.execute(&format!("pardon {player}")).await
    }

    pub async fn pardon_ip(&self, ip: &str) -> Result<String> {
        self.execute(&format!("pardon-ip {ip}")).await
    }

    pub async fn whitelist_add(&self, player: &str) -> Result<String> {
        self.execute(&format!("whitelist add {player}")).await
    }

    pub async fn whitelist_remove(&self, player: &str) -> Result<String> {
        self.execute(&format!("whitelist remove {player}")).await
    }

    /// Names currently on the whitelist; empty when there are none.
    pub async fn whitelist_list(&self) -> Result<Vec<String>> {
        let response = self.execute("whitelist list").await?;
        Ok(parse_whitelist(&response))
    }

    pub async fn whitelist_on(&self) -> Result<String> {
        self.execute("whitelist on").await
    }

    pub async fn whitelist_off(&self) -> Result<String> {
        self.execute("whitelist off").await
    }

    pub async fn whitelist_reload(&self) -> Result<String> {
        self.execute("whitelist reload").await
    }

    pub async fn op(&self, player: &str) -> Result<String> {
        self.execute(&format!("op {player}")).await
    }

    pub async fn deop(&self, player: &str) -> Result<String> {
        self.execute(&format!("deop {player}")).await
    }

    /// Change a player's game mode (survival, creative, adventure, spectator).
    pub async fn gamemode(&self, player: &str, mode: &str) -> Result<String> {
        self.execute(&format!("gamemode {mode} {player}")).await
    }

    /// Teleport a player to another player or to `"x y z"` coordinates.
    pub async fn tp(&self, player: &str, target_or_coords: &str) -> Result<String> {
        self.execute(&format!("tp {player} {target_or_coords}")).await
    }

    pub async fn give(&self, player: &str, item: &str, count: u32) -> Result<String> {
        self.execute(&format!("give {player} {item} {count}")).await
    }

    /// Set the world time (day, night, noon, midnight, or a tick count).
    pub async fn time_set(&self, time: &str) -> Result<String> {
        self.execute(&format!("time set {time}")).await
    }

    /// Change the weather (clear, rain, thunder), optionally for a duration
    /// in seconds.
    pub async fn weather(&self, kind: &str, duration: Option<u32>) -> Result<String> {
        let command = match duration {
            Some(seconds) => format!("weather {kind} {seconds}"),
            None => format!("weather {kind}"),
        };
        self.execute(&command).await
    }

    pub async fn difficulty(&self, level: &str) -> Result<String> {
        self.execute(&format!("difficulty {level}")).await
    }

    /// Fetch the world seed.
    pub async fn seed(&self) -> Result<String> {
        self.execute("seed").await
    }

    /// Save the world, optionally forcing an immediate flush to disk.
    pub async fn save_all(&self, flush: bool) -> Result<String> {
        let command = if flush { "save-all flush" } else { "save-all" };
        self.execute(command).await
    }

    pub async fn save_on(&self) -> Result<String> {
        self.execute("save-on").await
    }

    pub async fn save_off(&self) -> Result<String> {
        self.execute("save-off").await
    }

    /// Stop the server cleanly.
    pub async fn stop(&self) -> Result<String> {
        warn!("sending server stop command");
        self.execute("stop").await
    }
}

fn escape_quotes(text: &str) -> String {
    text.replace('"', "\\\"")
}

/// Parse the two response shapes of `list`:
/// `There are X of a max of Y players online: a, b` and
/// `There are X/Y players online: a, b`.
fn parse_player_list(response: &str) -> PlayerList {
    match try_parse_player_list(response) {
        Some(list) => list,
        None => {
            warn!("unparseable player list response: {response:?}");
            PlayerList::default()
        }
    }
}

fn try_parse_player_list(response: &str) -> Option<PlayerList> {
    if let Some((head, tail)) = response.split_once("of a max of") {
        let online = head.split_whitespace().last()?.parse().ok()?;
        let (max_part, names_part) = match tail.split_once("players online:") {
            Some((max_part, names_part)) => (max_part, names_part),
            None => (tail, ""),
        };
        let max_players = max_part.split_whitespace().next()?.parse().ok()?;
        return Some(PlayerList {
            online,
            max_players,
            names: split_names(names_part),
        });
    }

    let (online, max_players) = find_ratio(response)?;
    let names = match response.rsplit_once(':') {
        Some((_, tail)) => split_names(tail),
        None => Vec::new(),
    };
    Some(PlayerList {
        online,
        max_players,
        names,
    })
}

/// Find the `X/Y` pair in a response like `There are 2/10 players online`.
fn find_ratio(text: &str) -> Option<(u32, u32)> {
    let (left, right) = text.split_once('/')?;
    let online: String = left
        .chars()
        .rev()
        .take_while(|c| c.is_ascii_digit())
        .collect::<String>()
        .chars()
        .rev()
        .collect();
    let max_players: String = right.chars().take_while(|c| c.is_ascii_digit()).collect();
    Some((online.parse().ok()?, max_players.parse().ok()?))
}

fn parse_whitelist(response: &str) -> Vec<String> {
    if response.to_lowercase().contains("no whitelisted") {
        return Vec::new();
    }
    match response.rsplit_once(':') {
        Some((_, tail)) => split_names(tail),
        None => Vec::new(),
    }
}

fn split_names(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(String::from)
        .collect()
}
