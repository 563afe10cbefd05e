use sectree::{
    cli::{get_args, get_log_level_from_verbose, run},
    error::default_error_handler,
};

fn main() {
    let cli = get_args();
    let lvl = get_log_level_from_verbose(cli.verbose);
    env_logger::Builder::new().filter_level(lvl).init();

    if let Err(err) = run(cli) {
        default_error_handler(err);
    }
}
