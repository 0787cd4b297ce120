//! The native browser: one process, many isolated [`BrowserContext`]s and
//! [`Page`]s, all multiplexed over a single websocket by the [`Handler`].

use tokio::sync::mpsc;

use crate::error::Result;
use crate::handler::{Handler, HandlerHandle};
use crate::page::Page;
use crate::process::{BrowserProcess, LaunchConfig};
use crate::protocol::target::{
    AttachToTargetParams, BrowserContextId, CreateBrowserContextParams, CreateTargetParams,
    DisposeBrowserContextParams, SetDiscoverTargetsParams,
};

pub struct Browser {
    process: BrowserProcess,
    handler: HandlerHandle,
}

impl Browser {
    /// Launches a native chromium process and attaches to its devtools
    /// websocket, returning the handle plus the handler task to spawn.
    pub async fn launch(config: LaunchConfig) -> Result<Self> {
        let process = BrowserProcess::launch(&config).await?;
        let conn = crate::conn::Connection::connect(&process.ws_url).await?;
        let (tx, rx) = mpsc::unbounded_channel();
        let handler = Handler::new(conn, rx);
        let handle = HandlerHandle::new(tx);
        tokio::spawn(handler.run());

        handle
            .execute(SetDiscoverTargetsParams { discover: true }, None)
            .await?;

        Ok(Self {
            process,
            handler: handle,
        })
    }

    pub fn handle(&self) -> HandlerHandle {
        self.handler.clone()
    }

    pub async fn new_browser_context(&self) -> Result<BrowserContextId> {
        let resp = self
            .handler
            .execute(CreateBrowserContextParams::default(), None)
            .await?;
        Ok(resp.result.browser_context_id)
    }

    pub async fn dispose_browser_context(&self, id: BrowserContextId) -> Result<()> {
        self.handler
            .execute(DisposeBrowserContextParams { browser_context_id: id }, None)
            .await?;
        Ok(())
    }

    /// Opens a page in the given browser context and attaches a flattened
    /// devtools session to it. Returns the page handle plus the receiver
    /// for events scoped to that session.
    pub async fn new_page(
        &self,
        context: BrowserContextId,
        url: &str,
    ) -> Result<(Page, mpsc::UnboundedReceiver<crate::types::RawEvent>)> {
        let created = self
            .handler
            .execute(CreateTargetParams::new(url, context), None)
            .await?;
        let target_id = created.result.target_id;

        let attached = self
            .handler
            .execute(AttachToTargetParams::new(target_id.clone()), None)
            .await?;
        let session_id = attached.result.session_id;

        let events = self.handler.register_session(session_id.clone());
        let page = Page::new(self.handler.clone(), target_id, session_id);
        Ok((page, events))
    }

    pub async fn close_page(&self, page: &Page) -> Result<()> {
        self.handler.unregister_session(page.session_id().clone());
        self.handler
            .execute(
                crate::protocol::target::CloseTargetParams {
                    target_id: page.target_id().clone(),
                },
                None,
            )
            .await?;
        Ok(())
    }

    pub async fn shutdown(mut self) {
        self.process.shutdown().await;
    }
}
