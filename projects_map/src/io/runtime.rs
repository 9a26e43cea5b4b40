//! Managed thread for an IO runtime. Concrete implementation depends on the target.

#[cfg(not(target_arch = "wasm32"))]
pub use native::*;

#[cfg(target_arch = "wasm32")]
pub use web::*;

#[cfg(target_arch = "wasm32")]
mod web {
    /// In the browser, futures are driven by the page's event loop.
    pub struct Runtime;

    impl Runtime {
        pub fn spawn<F>(_name: &str, f: F) -> std::io::Result<Self>
        where
            F: std::future::Future<Output = ()> + 'static,
        {
            wasm_bindgen_futures::spawn_local(f);
            Ok(Self {})
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
mod native {
    /// Tokio runtime running on its own thread for as long as this value lives.
    pub struct Runtime {
        join_handle: Option<std::thread::JoinHandle<()>>,
        quit_tx: tokio::sync::mpsc::UnboundedSender<()>,
    }

    impl Runtime {
        pub fn spawn<F>(name: &str, f: F) -> std::io::Result<Self>
        where
            F: std::future::Future + Send + 'static,
            F::Output: Send,
        {
            let (quit_tx, mut quit_rx) = tokio::sync::mpsc::unbounded_channel();

            let join_handle = std::thread::Builder::new()
                .name(format!("tiles-{name}"))
                .spawn(move || {
                    let runtime = match tokio::runtime::Builder::new_current_thread()
                        .enable_all()
                        .build()
                    {
                        Ok(runtime) => runtime,
                        Err(error) => {
                            log::error!("Could not create the Tokio runtime: {error}.");
                            return;
                        }
                    };

                    runtime.spawn(f);
                    runtime.block_on(quit_rx.recv());
                })?;

            Ok(Self {
                join_handle: Some(join_handle),
                quit_tx,
            })
        }
    }

    impl Drop for Runtime {
        fn drop(&mut self) {
            // Tokio thread might be dead, nothing to do in this case.
            self.quit_tx.send(()).ok();

            if let Some(join_handle) = self.join_handle.take() {
                log::debug!("Waiting for the IO thread to exit.");
                if join_handle.join().is_err() {
                    log::warn!("IO thread panicked.");
                }
            }

            log::debug!("IO thread is down.");
        }
    }
}
