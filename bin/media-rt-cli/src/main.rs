// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # media-rt
//!
//! Diagnostic command-line interface for the buffer, image and tensor layers.
//!
//! ## Usage
//! ```bash
//! # Image geometry for one format (or every format with --all)
//! media-rt image --width 640 --height 480 --format NV12
//!
//! # Tensor geometry
//! media-rt tensor --shape 1,3,224,224 --layout NCHW --dtype f32
//!
//! # Exercise the buffer pool
//! media-rt pool --size 1M --cycles 100 --config pool.toml
//! ```

mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "media-rt",
    about = "Inspect image/tensor layouts and exercise the buffer pool",
    version
)]
struct Cli {
    /// Enable verbose logging (repeat for more: -v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the byte layout of an image.
    Image {
        #[arg(long, default_value_t = 640)]
        width: usize,

        #[arg(long, default_value_t = 480)]
        height: usize,

        /// Frames in the batch.
        #[arg(short, long, default_value_t = 1)]
        number: usize,

        /// Pixel format name, e.g. RGB888, NV12, RGB888_PLANAR.
        #[arg(short, long, default_value = "RGB888")]
        format: String,

        /// List the layout of every pixel format instead.
        #[arg(long)]
        all: bool,
    },

    /// Print the geometry of a tensor and allocate it.
    Tensor {
        /// Four comma-separated dimensions.
        #[arg(short, long, default_value = "1,3,224,224")]
        shape: String,

        /// NCHW or NHWC.
        #[arg(short, long, default_value = "NCHW")]
        layout: String,

        /// Element type, e.g. f32, u8, FLOAT16.
        #[arg(short, long, default_value = "f32")]
        dtype: String,

        /// Also transpose the tensor (needs dims 0 and 1 equal to 1, f32).
        #[arg(long)]
        transpose: bool,
    },

    /// Run allocate/release cycles against a buffer pool and print its state.
    Pool {
        /// Block size, e.g. "4096", "64K", "1M".
        #[arg(short, long, default_value = "1M")]
        size: String,

        /// Number of allocate/release cycles.
        #[arg(short, long, default_value_t = 100)]
        cycles: usize,

        /// Buffers held at once in every cycle.
        #[arg(long, default_value_t = 1)]
        hold: usize,

        /// Path to a TOML pool configuration.
        #[arg(long)]
        config: Option<std::path::PathBuf>,

        /// Print the final snapshot as JSON.
        #[arg(long)]
        json: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    commands::init_tracing(cli.verbose);

    match cli.command {
        Commands::Image {
            width,
            height,
            number,
            format,
            all,
        } => commands::image::execute(width, height, number, &format, all),
        Commands::Tensor {
            shape,
            layout,
            dtype,
            transpose,
        } => commands::tensor::execute(&shape, &layout, &dtype, transpose),
        Commands::Pool {
            size,
            cycles,
            hold,
            config,
            json,
        } => commands::pool::execute(&size, cycles, hold, config, json),
    }
}
