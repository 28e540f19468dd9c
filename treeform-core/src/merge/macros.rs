/// Implements [`Mergeable`](crate::merge::Mergeable) from a field schema.
///
/// ```text
/// mergeable! {
///     Mode {
///         scalars: [emitter_id, mode_name, amplitude],
///         children: [beams => emitter_mode_id, pris => emitter_mode_id],
///     }
/// }
/// ```
///
/// Every type must have an `id: Uuid` field. Each child entry names the
/// collection field and the parent-reference field of its element type.
macro_rules! mergeable {
    (
        $ty:ident {
            scalars: [$($scalar:ident),* $(,)?],
            children: [$($child:ident => $link:ident),* $(,)?] $(,)?
        }
    ) => {
        impl $crate::merge::Mergeable for $ty {
            #[allow(unused_variables)]
            fn merge_from(
                &mut self,
                incoming: &Self,
                ctx: &mut $crate::merge::MergeContext,
                parent_link: ::std::option::Option<&str>,
            ) {
                $(
                    if parent_link != Some(stringify!($scalar)) && self.$scalar != incoming.$scalar {
                        self.$scalar = incoming.$scalar.clone();
                        ctx.record_set(stringify!($scalar), &self.$scalar);
                    }
                )*
                let owner = self.id;
                $(
                    $crate::merge::merge_collection(
                        &mut self.$child,
                        &incoming.$child,
                        ctx,
                        stringify!($child),
                        stringify!($link),
                        |node| node.$link = owner,
                    );
                )*
            }

            #[allow(unused_variables)]
            fn assign_identity(&mut self, policy: $crate::merge::IdPolicy) {
                self.id = policy.resolve(self.id);
                let owner = self.id;
                $(
                    for node in self.$child.iter_mut() {
                        node.$link = owner;
                        $crate::merge::Mergeable::assign_identity(node, policy);
                    }
                )*
            }
        }
    };
}

pub(crate) use mergeable;
