use snafu::Snafu;

pub(crate) type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("No http:// or https:// target address found in command"))]
    TargetNotFound,

    #[snafu(display("Failed to render request template"))]
    Render { source: minijinja::Error },
}
