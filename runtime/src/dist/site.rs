//! Per-process site context
//!
//! Bundles the ambient facts of the hosting runtime (site count, local site
//! index) with the collaborators every distributed object on this site
//! shares: the directory, the remote invoker and the local partition server.

use super::directory::Directory;
use super::server::PartitionServer;
use super::transport::RemoteInvoker;
use crate::config::SiteConfig;
use crate::errors::{Result, RuntimeError};
use std::fmt;
use std::sync::Arc;

#[derive(Clone)]
pub struct Site {
    config: SiteConfig,
    directory: Arc<dyn Directory>,
    invoker: Arc<dyn RemoteInvoker>,
    server: Arc<PartitionServer>,
}

impl Site {
    pub fn new(
        config: SiteConfig,
        directory: Arc<dyn Directory>,
        invoker: Arc<dyn RemoteInvoker>,
        server: Arc<PartitionServer>,
    ) -> Result<Self> {
        config.validate()?;
        if server.site() != config.this_site {
            return Err(RuntimeError::Config(format!(
                "partition server belongs to site {}, not site {}",
                server.site(),
                config.this_site
            )));
        }
        Ok(Self {
            config,
            directory,
            invoker,
            server,
        })
    }

    pub fn site_count(&self) -> usize {
        self.config.site_count
    }

    pub fn this_site(&self) -> usize {
        self.config.this_site
    }

    pub fn directory(&self) -> &Arc<dyn Directory> {
        &self.directory
    }

    pub fn invoker(&self) -> &Arc<dyn RemoteInvoker> {
        &self.invoker
    }

    pub fn server(&self) -> &Arc<PartitionServer> {
        &self.server
    }
}

impl fmt::Debug for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Site")
            .field("site_count", &self.config.site_count)
            .field("this_site", &self.config.this_site)
            .finish_non_exhaustive()
    }
}
