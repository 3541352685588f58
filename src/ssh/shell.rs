// ABOUTME: Remote shell over a russh session channel.
// ABOUTME: Feeds a script as stdin and forwards stdout until the shell exits.

use super::error::{Error, Result};
use crate::session::ShellChannel;
use async_trait::async_trait;
use russh::client::Msg;
use russh::{Channel, ChannelMsg};
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// One shell invocation on its own session channel.
pub struct Shell {
    channel: Channel<Msg>,
}

impl std::fmt::Debug for Shell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shell")
            .field("channel", &self.channel.id())
            .finish()
    }
}

impl Shell {
    pub fn new(channel: Channel<Msg>) -> Self {
        Self { channel }
    }
}

#[async_trait]
impl ShellChannel for Shell {
    async fn start(&mut self, input: &[u8]) -> Result<()> {
        self.channel.request_shell(true).await?;
        self.channel.data(input).await?;
        self.channel.eof().await?;
        Ok(())
    }

    async fn wait(&mut self, stdout: &mut (dyn AsyncWrite + Send + Unpin)) -> Result<()> {
        let mut exit_status = None;

        loop {
            match self.channel.wait().await {
                Some(ChannelMsg::Data { data }) => {
                    stdout.write_all(&data).await?;
                }
                // stderr is not forwarded
                Some(ChannelMsg::ExtendedData { .. }) => {}
                Some(ChannelMsg::ExitStatus { exit_status: code }) => {
                    exit_status = Some(code);
                }
                Some(ChannelMsg::ExitSignal { signal_name, .. }) => {
                    return Err(Error::ExitSignal(format!("{:?}", signal_name)));
                }
                Some(ChannelMsg::Close) | None => break,
                Some(_) => {}
            }
        }

        match exit_status {
            Some(0) => Ok(()),
            Some(code) => Err(Error::ExitStatus(code)),
            None => Err(Error::ChannelClosed),
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.channel.close().await?;
        Ok(())
    }
}
