//! Builtin stages.
//!
//! Each constructor returns a small builder that converts into a
//! [`Stage`](crate::Stage), so they can be dropped straight into
//! [`pipeline!`](crate::pipeline):
//!
//! ```ignore
//! pipeline![find(".").files_only().name("*.*"), sort(), uniq().count()]
//! ```
//!
//! | role      | stages                                              |
//! |-----------|-----------------------------------------------------|
//! | source    | `seq`, `yes`, `echo`, `cat`, `find`, `ls`           |
//! | transform | `head`, `tail`, `grep`, `sort`, `uniq`, `tee`, `awk`, `map`, `filter` |
//! | sink      | `collect_into`, `discard`, `stdout`                 |

pub mod glob;

mod awk;
mod cat;
mod closure;
mod echo;
mod find;
mod grep;
mod head;
mod ls;
mod seq;
mod sink;
mod sort;
mod tail;
mod tee;
mod uniq;
mod yes;

pub use awk::{awk, Awk, AwkProgram};
pub use cat::{cat, Cat};
pub use closure::{filter, map, Filter, Map};
pub use echo::{echo, Echo};
pub use find::{find, Find};
pub use grep::{grep, Grep};
pub use head::{head, Head};
pub use ls::{ls, Ls};
pub use seq::{seq, Seq};
pub use sink::{collect_into, discard, stdout, Collect, Collected, Discard, Stdout};
pub use sort::{sort, Sort};
pub use tail::{tail, Tail};
pub use tee::{tee, Tee};
pub use uniq::{uniq, Uniq};
pub use yes::{yes, Yes};

pub use crate::scheduler::for_each;

#[cfg(test)]
pub(crate) mod testing {
    use crate::Pipeline;

    /// Run a pipeline to completion and return its output lines.
    pub async fn run_lines(pipeline: Pipeline) -> Vec<String> {
        pipeline
            .collect()
            .await
            .expect("pipeline failed")
            .into_iter()
            .map(|r| r.into_line())
            .collect()
    }
}
