// -------------------------------------------------------------------------------------------------
//  Copyright (C) 2015-2025 Nautech Systems Pty Ltd. All rights reserved.
//  https://nautechsystems.io
//
//  Licensed under the GNU Lesser General Public License Version 3.0 (the "License");
//  You may not use this file except in compliance with the License.
//  You may obtain a copy of the License at https://www.gnu.org/licenses/lgpl-3.0.en.html
//
//  Unless required by applicable law or agreed to in writing, software
//  distributed under the License is distributed on an "AS IS" BASIS,
//  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//  See the License for the specific language governing permissions and
//  limitations under the License.
// -------------------------------------------------------------------------------------------------

#![warn(rustc::all)]
#![deny(unsafe_code)]
#![deny(nonstandard_style)]
#![deny(missing_debug_implementations)]

pub mod opt;

use marlin_fix::{FixConfig, FixEngine};

use crate::opt::{Commands, MarlinCli};

/// Exit code for a clean logout.
pub const EXIT_OK: i32 = 0;
/// Exit code for a fatal session error.
pub const EXIT_SESSION_FATAL: i32 = 1;
/// Exit code for a configuration error.
pub const EXIT_CONFIG: i32 = 2;
/// Exit code when interrupted.
pub const EXIT_INTERRUPTED: i32 = 130;

/// Runs the selected command, returning the process exit code.
pub async fn run(opt: MarlinCli) -> i32 {
    match opt.command {
        Commands::Run => run_session().await,
    }
}

async fn run_session() -> i32 {
    let config = match FixConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Configuration error: {e}");
            return EXIT_CONFIG;
        }
    };

    let mut engine = match FixEngine::new(config) {
        Ok(engine) => engine,
        Err(e) => {
            tracing::error!("Configuration error: {e}");
            return EXIT_CONFIG;
        }
    };

    let handle = engine.handle();
    if let Some(mut inbound) = engine.take_inbound() {
        tokio::spawn(async move {
            while let Some(message) = inbound.recv().await {
                tracing::debug!("Application boundary received {message}");
            }
        });
    }

    let mut session = Box::pin(engine.run());
    tokio::select! {
        result = &mut session => match result {
            Ok(()) => EXIT_OK,
            Err(e) => {
                tracing::error!("Session terminated abnormally: {e}");
                EXIT_SESSION_FATAL
            }
        },
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received interrupt");
            handle.stop();
            let _ = session.await;
            EXIT_INTERRUPTED
        }
    }
}
