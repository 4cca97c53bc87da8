use nfsserve::nfs::cookieverf3;

use crate::{Handle, ItemAttributes, NfsError, NfsResult, Procedure, ReadDirArgs, RpcChannel};

use super::session::{settle, NfsSession};

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

/// Directory enumeration.
impl<C> NfsSession<C>
where
    C: RpcChannel,
{
    /// Returns the entry names of the directory at `path`, in server order.
    pub async fn get_item_list(&mut self, path: &str) -> NfsResult<Vec<String>> {
        let attributes = self.get_item_attributes(path).await?;
        self.list(attributes.get_handle()).await
    }

    /// Returns the entry names of a directory whose attributes the caller already holds.
    ///
    /// Skips the path resolution of [`get_item_list`](Self::get_item_list).
    pub async fn get_item_list_with(
        &mut self,
        attributes: &ItemAttributes,
    ) -> NfsResult<Vec<String>> {
        self.list(attributes.get_handle()).await
    }

    /// Returns the entry names of the directory identified by `directory`, in server order.
    ///
    /// Pages are requested one after another, each continuing from the last cookie and verifier
    /// of the previous page, until a page reports the end of the listing. The type of
    /// `directory` is not checked; listing a non-directory surfaces the server's error.
    ///
    /// ## Errors
    ///
    /// If any page fails the whole call fails, and names from earlier pages are discarded.
    pub async fn list(&mut self, directory: &Handle) -> NfsResult<Vec<String>> {
        self.ensure_mounted()?;

        let timeout = self.timeout();
        let count = self.get_options().get_readdir_max_bytes();
        let mut names = Vec::new();
        let mut cookie = 0;
        let mut cookieverf: cookieverf3 = Default::default();

        loop {
            let args = ReadDirArgs {
                dir: directory.to_wire(),
                cookie,
                cookieverf,
                count,
            };
            let page = settle(Procedure::ReadDir, timeout, self.channel()?.readdir(args)).await?;

            tracing::trace!(
                "readdir: dir: {}, cookie: {}, entries: {}, eof: {}",
                directory,
                cookie,
                page.entries.len(),
                page.eof
            );

            if page.eof {
                names.extend(page.entries.iter().map(|entry| entry_name(&entry.name.0)));
                break;
            }

            let Some(last) = page.entries.last() else {
                return Err(NfsError::custom(anyhow::anyhow!(
                    "{}: empty page before end of listing",
                    Procedure::ReadDir
                )));
            };

            cookie = last.cookie;
            cookieverf = page.cookieverf;
            names.extend(page.entries.iter().map(|entry| entry_name(&entry.name.0)));
        }

        Ok(names)
    }
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

fn entry_name(name: &[u8]) -> String {
    String::from_utf8_lossy(name).into_owned()
}
