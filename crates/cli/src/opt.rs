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

use clap::Parser;

/// Main CLI structure for parsing command-line arguments and options.
#[derive(Debug, Parser)]
#[clap(version, about, author)]
pub struct MarlinCli {
    #[clap(subcommand)]
    pub command: Commands,
}

/// Available top-level commands for the Marlin CLI.
#[derive(Parser, Debug)]
pub enum Commands {
    /// Loads configuration from `FIX_*` environment variables and runs the
    /// session pipeline until logout or failure.
    Run,
}
