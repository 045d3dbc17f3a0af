use crate::Opts;
use clap::Parser;
use once_cell::sync::OnceCell;

static OPTS: OnceCell<Opts> = OnceCell::new();

pub(crate) fn get() -> &'static Opts {
    OPTS.get_or_init(Opts::parse)
}
